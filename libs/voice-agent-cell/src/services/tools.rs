// libs/voice-agent-cell/src/services/tools.rs
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::warn;

use shared_utils::time::{format_time_for_db, today_ist};

use crate::models::VoiceAgentError;

/// Tools the realtime model may invoke during a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentTool {
    ScheduleAppointment,
    CheckAvailability,
    RescheduleAppointment,
    CancelAppointment,
    GetAvailableSlots,
    GetTodayDate,
    GetDoctorDetailsForUser,
    GetUserIdByAgentPhone,
    GetAppointmentDetails,
    ListAppointmentsForPatient,
    GetUserSettings,
}

impl AgentTool {
    pub const ALL: [AgentTool; 11] = [
        AgentTool::ScheduleAppointment,
        AgentTool::CheckAvailability,
        AgentTool::RescheduleAppointment,
        AgentTool::CancelAppointment,
        AgentTool::GetAvailableSlots,
        AgentTool::GetTodayDate,
        AgentTool::GetDoctorDetailsForUser,
        AgentTool::GetUserIdByAgentPhone,
        AgentTool::GetAppointmentDetails,
        AgentTool::ListAppointmentsForPatient,
        AgentTool::GetUserSettings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentTool::ScheduleAppointment => "schedule_appointment",
            AgentTool::CheckAvailability => "check_availability",
            AgentTool::RescheduleAppointment => "reschedule_appointment",
            AgentTool::CancelAppointment => "cancel_appointment",
            AgentTool::GetAvailableSlots => "get_available_slots",
            AgentTool::GetTodayDate => "get_today_date",
            AgentTool::GetDoctorDetailsForUser => "get_doctor_details_for_user",
            AgentTool::GetUserIdByAgentPhone => "get_user_id_by_agent_phone",
            AgentTool::GetAppointmentDetails => "get_appointment_details",
            AgentTool::ListAppointmentsForPatient => "list_appointments_for_patient",
            AgentTool::GetUserSettings => "get_user_settings",
        }
    }

    /// Answered by the worker without a backend round trip.
    pub fn is_local(&self) -> bool {
        matches!(self, AgentTool::GetTodayDate)
    }

    /// Whether the backend endpoint needs the clinic owner header.
    pub fn needs_clinic(&self) -> bool {
        !matches!(self, AgentTool::GetTodayDate | AgentTool::GetUserIdByAgentPhone)
    }

    fn time_field(&self) -> Option<&'static str> {
        match self {
            AgentTool::ScheduleAppointment | AgentTool::CheckAvailability => Some("appointment_time"),
            AgentTool::RescheduleAppointment => Some("new_time"),
            _ => None,
        }
    }
}

impl FromStr for AgentTool {
    type Err = VoiceAgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentTool::ALL
            .into_iter()
            .find(|tool| tool.name() == s)
            .ok_or_else(|| VoiceAgentError::UnknownTool(s.to_string()))
    }
}

/// Today's clinic date, as `get_today_date` answers it.
pub fn today_date() -> String {
    today_ist().format("%Y-%m-%d").to_string()
}

/// Strip identity fields the model may have invented and normalise times.
/// The session's own ids travel as headers, never in the body.
pub fn prepare_arguments(tool: AgentTool, args: Value) -> Result<Map<String, Value>, VoiceAgentError> {
    let mut args = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(VoiceAgentError::InvalidArguments(format!(
                "{} expects an object, got {}",
                tool.name(),
                other
            )))
        }
    };

    args.remove("user_id");
    args.remove("call_id");

    if let Some(field) = tool.time_field() {
        if let Some(raw) = args.get(field).and_then(Value::as_str).map(str::to_string) {
            // Unparseable times go through unchanged; the backend explains the rejection.
            match format_time_for_db(&raw) {
                Ok(normalised) => {
                    args.insert(field.to_string(), Value::String(normalised));
                }
                Err(e) => warn!("{}: {}", tool.name(), e),
            }
        }
    }

    Ok(args)
}

fn arg<'a>(args: &'a Map<String, Value>, key: &str, fallback: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

/// One line of the call's tool log, for tools that change or look up the
/// schedule.
pub fn describe_call(tool: AgentTool, args: &Map<String, Value>) -> Option<String> {
    match tool {
        AgentTool::ScheduleAppointment => Some(format!(
            "Scheduled appointment for {} with {} on {}",
            arg(args, "patient_name", "patient"),
            arg(args, "assigned_doctor", "doctor"),
            arg(args, "appointment_date", "date"),
        )),
        AgentTool::CheckAvailability => Some(format!(
            "Checked availability for {} on {}",
            arg(args, "doctor_name", "doctor"),
            arg(args, "appointment_date", "date"),
        )),
        AgentTool::RescheduleAppointment => Some(format!(
            "Rescheduled appointment {} to {}",
            arg(args, "appointment_id", "ID"),
            arg(args, "new_date", "date"),
        )),
        AgentTool::CancelAppointment => Some(format!(
            "Cancelled appointment {}",
            arg(args, "appointment_id", "ID")
        )),
        AgentTool::GetAvailableSlots => Some(format!(
            "Retrieved available slots for {}",
            arg(args, "doctor_name", "doctor")
        )),
        _ => None,
    }
}
