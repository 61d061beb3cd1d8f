// libs/voice-agent-cell/src/services/session.rs
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use shared_utils::time::now_ist;

use crate::models::{
    CallAppointmentStatus, CallMetadata, SessionDispatch, SessionInstructions, SessionSnapshot,
    SessionState, TranscriptLine, VoiceAgentError,
};

static CALLER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^call-_([+0-9]+)_").unwrap());

/// Caller number encoded by the SIP bridge, e.g. `call-_+919876543210_abc`.
pub fn caller_number_from_room(room_name: &str) -> Option<String> {
    CALLER_NUMBER
        .captures(room_name)
        .map(|caps| caps[1].to_string())
}

/// One call owned by this worker.
#[derive(Debug)]
pub struct VoiceSession {
    pub id: String,
    pub owner: String,
    pub state: SessionState,
    pub call: CallMetadata,
    pub user_id: Option<Uuid>,
    pub doctors: Vec<String>,
    pub instructions: SessionInstructions,
    pub appointment_status: CallAppointmentStatus,
    pub transcript: Vec<TranscriptLine>,
    pub tool_log: Vec<String>,
    pub call_summary: Option<String>,
}

impl VoiceSession {
    pub fn claimed(dispatch: &SessionDispatch, owner: &str, called_number: &str) -> Self {
        Self {
            id: dispatch.session_id.clone(),
            owner: owner.to_string(),
            state: SessionState::Claimed,
            call: CallMetadata {
                call_id: dispatch.session_id.clone(),
                room_name: dispatch.room_name.clone(),
                caller_number: caller_number_from_room(&dispatch.room_name),
                called_number: called_number.to_string(),
                call_start: now_ist(),
            },
            user_id: None,
            doctors: Vec::new(),
            instructions: SessionInstructions::default(),
            appointment_status: CallAppointmentStatus::NotBooked,
            transcript: Vec::new(),
            tool_log: Vec::new(),
            call_summary: None,
        }
    }

    pub fn transition(&mut self, next: SessionState) -> Result<(), VoiceAgentError> {
        if !self.state.can_transition_to(&next) {
            return Err(VoiceAgentError::InvalidTransition {
                session_id: self.id.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn ensure_active(&self) -> Result<(), VoiceAgentError> {
        if self.state != SessionState::Active {
            return Err(VoiceAgentError::NotActive {
                session_id: self.id.clone(),
                state: self.state,
            });
        }
        Ok(())
    }

    pub fn conversation_text(&self) -> String {
        self.transcript
            .iter()
            .map(TranscriptLine::render)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            owner: self.owner.clone(),
            state: self.state,
            user_id: self.user_id,
            call: self.call.clone(),
            doctors: self.doctors.clone(),
            appointment_status: self.appointment_status,
            transcript_lines: self.transcript.len(),
            tool_log: self.tool_log.clone(),
            instructions: self.instructions.clone(),
            call_summary: self.call_summary.clone(),
        }
    }
}
