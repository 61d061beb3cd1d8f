// libs/voice-agent-cell/src/services/outcome.rs
use crate::models::CallAppointmentStatus;
use crate::services::tools::AgentTool;

/// Fold one tool result into the call's appointment status. A booking only
/// counts when the backend confirmed it without offering other times.
pub fn apply_tool_result(
    current: CallAppointmentStatus,
    tool: AgentTool,
    result: &str,
) -> CallAppointmentStatus {
    let result = result.to_lowercase();

    match tool {
        AgentTool::ScheduleAppointment
            if result.contains("appointment scheduled successfully")
                && !result.contains("however")
                && !result.contains("openings at") =>
        {
            CallAppointmentStatus::Booked
        }
        AgentTool::RescheduleAppointment if result.contains("successfully") => CallAppointmentStatus::Rescheduled,
        AgentTool::CancelAppointment if result.contains("successfully") => CallAppointmentStatus::Cancelled,
        _ => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CallAppointmentStatus::*;

    #[test]
    fn test_clean_booking_marks_booked() {
        assert_eq!(
            apply_tool_result(NotBooked, AgentTool::ScheduleAppointment, "Appointment scheduled successfully."),
            Booked
        );
    }

    #[test]
    fn test_alternatives_do_not_count_as_booking() {
        let offer = "Dr. Asha Rao is not available at 8:00 PM. However, they have openings at: 9:00 AM, 9:30 AM. Would any of these times work for you?";
        assert_eq!(apply_tool_result(NotBooked, AgentTool::ScheduleAppointment, offer), NotBooked);

        let taken = "Dr. Asha Rao is already booked at 10:00 AM on 2030-03-04, and there are no other available slots on that day.";
        assert_eq!(apply_tool_result(NotBooked, AgentTool::ScheduleAppointment, taken), NotBooked);
    }

    #[test]
    fn test_reschedule_and_cancel() {
        assert_eq!(
            apply_tool_result(Booked, AgentTool::RescheduleAppointment, "Appointment rescheduled successfully."),
            Rescheduled
        );
        assert_eq!(
            apply_tool_result(Booked, AgentTool::CancelAppointment, "Appointment cancelled successfully."),
            Cancelled
        );
        assert_eq!(
            apply_tool_result(Booked, AgentTool::CancelAppointment, "Appointment not found for cancellation."),
            Booked
        );
    }

    #[test]
    fn test_lookups_leave_status_alone() {
        assert_eq!(
            apply_tool_result(Cancelled, AgentTool::CheckAvailability, "Doctor is available successfully"),
            Cancelled
        );
    }
}
