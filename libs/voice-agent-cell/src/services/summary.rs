// libs/voice-agent-cell/src/services/summary.rs
use tracing::{debug, warn};

use crate::models::CallAppointmentStatus;
use crate::services::mcp_client::McpClient;

const MIN_TRANSCRIPT_CHARS: usize = 10;
const MIN_SUMMARY_CHARS: usize = 5;

/// Summary built from what the caller asked for when no model summary is
/// available.
pub fn fallback_summary(status: CallAppointmentStatus, conversation: &str) -> String {
    let base = match status {
        CallAppointmentStatus::Booked => "Patient called and successfully scheduled an appointment",
        CallAppointmentStatus::Rescheduled => "Patient called and rescheduled an existing appointment",
        CallAppointmentStatus::Cancelled => "Patient called and cancelled an appointment",
        CallAppointmentStatus::NotBooked => "Patient called the clinic",
    };

    if !conversation.is_empty() {
        let lower = conversation.to_lowercase();

        if (lower.contains("doctor") || lower.contains("dr.")) && lower.contains("appointment") {
            match status {
                CallAppointmentStatus::Booked | CallAppointmentStatus::Cancelled => {
                    return format!("{} with a doctor", base)
                }
                CallAppointmentStatus::Rescheduled => return format!("{} to a new time", base),
                CallAppointmentStatus::NotBooked => {}
            }
        }

        if lower.contains("available") || lower.contains("slot") {
            return format!("{} and inquired about available appointment slots", base);
        } else if lower.contains("timing") || lower.contains("hours") {
            return format!("{} and asked about clinic timings", base);
        } else if lower.contains("address") || lower.contains("location") {
            return format!("{} and asked for clinic address", base);
        }
    }

    format!("{}.", base)
}

pub fn tool_log_summary(tool_log: &[String]) -> String {
    format!("Patient called the clinic. {}.", tool_log.join(" "))
}

/// Tool log first; otherwise ask the backend to summarise a real
/// conversation; otherwise the fallback.
pub async fn summarize_session(
    mcp: &McpClient,
    call_id: &str,
    tool_log: &[String],
    conversation: &str,
    status: CallAppointmentStatus,
) -> String {
    if !tool_log.is_empty() {
        return tool_log_summary(tool_log);
    }

    if conversation.trim().chars().count() <= MIN_TRANSCRIPT_CHARS {
        return fallback_summary(status, "");
    }

    match mcp.summarize_call(conversation, call_id).await {
        Ok(summary) if summary.trim().chars().count() > MIN_SUMMARY_CHARS => summary,
        Ok(summary) => {
            debug!("Summary for {} too short ({:?}), using fallback", call_id, summary);
            fallback_summary(status, conversation)
        }
        Err(e) => {
            warn!("Summarizing call {} failed: {}", call_id, e);
            fallback_summary(status, conversation)
        }
    }
}
