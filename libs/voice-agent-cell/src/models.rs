// libs/voice-agent-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use session_registry_cell::RegistryError;
use shared_models::error::AppError;

use crate::services::mcp_client::McpError;

/// Rooms the telephony bridge opens for inbound calls.
pub const CALL_ROOM_PREFIX: &str = "call-";

// ==============================================================================
// SESSION STATE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Claimed,
    Resolving,
    Active,
    Closing,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Claimed, Resolving) => true,
            (Resolving, Active) => true,
            (Claimed | Resolving | Active, Closing) => true,
            (Closing, Closed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Claimed => "claimed",
            SessionState::Resolving => "resolving",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the call achieved, as stored on the call history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallAppointmentStatus {
    #[serde(rename = "Not Booked")]
    NotBooked,
    Booked,
    Rescheduled,
    Cancelled,
}

impl CallAppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallAppointmentStatus::NotBooked => "Not Booked",
            CallAppointmentStatus::Booked => "Booked",
            CallAppointmentStatus::Rescheduled => "Rescheduled",
            CallAppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for CallAppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    RoomFinished,
    Ended,
    Requested,
    Shutdown,
}

// ==============================================================================
// CALL DATA
// ==============================================================================

/// A call the voice provider handed to this worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDispatch {
    pub session_id: String,
    pub room_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallMetadata {
    pub call_id: String,
    pub room_name: String,
    pub caller_number: Option<String>,
    pub called_number: String,
    pub call_start: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptLine {
    pub fn render(&self) -> String {
        match self.speaker {
            Speaker::User => format!("User: {}", self.text),
            Speaker::Agent => format!("Agent: {}", self.text),
        }
    }
}

/// Prompts handed to the realtime model when the call connects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionInstructions {
    pub agent: String,
    pub session: String,
}

/// Read-only view of a session for the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub owner: String,
    pub state: SessionState,
    pub user_id: Option<Uuid>,
    pub call: CallMetadata,
    pub doctors: Vec<String>,
    pub appointment_status: CallAppointmentStatus,
    pub transcript_lines: usize,
    pub tool_log: Vec<String>,
    pub instructions: SessionInstructions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_summary: Option<String>,
}

// ==============================================================================
// REQUEST / RESPONSE TYPES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EndSessionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EndOutcome {
    Closed { session: SessionSnapshot },
    /// Another worker owns the session and will close it on its next heartbeat.
    Forwarded { session_id: String, owner: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Started { session: SessionSnapshot },
    Ended { outcome: EndOutcome },
    Ignored { event: String },
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum VoiceAgentError {
    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Session {session_id} is owned by {owner}")]
    OwnedElsewhere { session_id: String, owner: String },

    #[error("Session {session_id} cannot move from {from} to {to}")]
    InvalidTransition {
        session_id: String,
        from: SessionState,
        to: SessionState,
    },

    #[error("Session {session_id} is {state}, not active")]
    NotActive { session_id: String, state: SessionState },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Webhook rejected: {0}")]
    InvalidWebhook(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Mcp(#[from] McpError),
}

impl From<VoiceAgentError> for AppError {
    fn from(err: VoiceAgentError) -> Self {
        match err {
            VoiceAgentError::SessionNotFound(_) => AppError::NotFound(err.to_string()),
            VoiceAgentError::OwnedElsewhere { .. }
            | VoiceAgentError::InvalidTransition { .. }
            | VoiceAgentError::NotActive { .. } => AppError::Conflict(err.to_string()),
            VoiceAgentError::UnknownTool(_) | VoiceAgentError::InvalidArguments(_) => {
                AppError::BadRequest(err.to_string())
            }
            VoiceAgentError::InvalidWebhook(_) => AppError::Auth(err.to_string()),
            VoiceAgentError::Registry(e) => AppError::Unavailable(e.to_string()),
            VoiceAgentError::Mcp(McpError::Rejected { message, .. }) => AppError::BadRequest(message),
            VoiceAgentError::Mcp(e) => AppError::ExternalService(e.to_string()),
        }
    }
}
