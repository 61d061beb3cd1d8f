// libs/call-history-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const CALL_HISTORY_ADDED: &str = "Call history added successfully.";
pub const CALL_HISTORY_EXISTS: &str = "Call history record already exists for this call";

/// One finished call as the voice worker reports it. Timestamps are
/// ISO-8601 strings stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddCallHistoryRequest {
    #[serde(default)]
    pub caller_number: Option<String>,
    pub called_number: String,
    pub call_start: String,
    pub call_end: String,
    pub call_duration: String,
    pub call_status: String,
    pub appointment_status: String,
    pub call_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallHistoryRow {
    #[serde(default)]
    pub row_id: Option<i64>,
    pub call_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub appointment_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallHistoryOutcome {
    Added,
    AlreadyExists,
}

impl CallHistoryOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            CallHistoryOutcome::Added => CALL_HISTORY_ADDED,
            CallHistoryOutcome::AlreadyExists => CALL_HISTORY_EXISTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeCallRequest {
    pub transcript: String,
}

// Gemini generateContent wire format (only the fields we read).

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Error)]
pub enum CallHistoryError {
    #[error("Invalid call history: {0}")]
    Invalid(String),

    #[error("Call history was not stored: {0}")]
    NotPersisted(String),

    #[error("Summarizer request failed: {0}")]
    Summarizer(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<CallHistoryError> for AppError {
    fn from(err: CallHistoryError) -> Self {
        match err {
            CallHistoryError::Invalid(msg) => AppError::ValidationError(msg),
            CallHistoryError::NotPersisted(msg) => AppError::Database(msg),
            CallHistoryError::Summarizer(msg) => AppError::ExternalService(msg),
            CallHistoryError::Database(e) => e.into(),
        }
    }
}
