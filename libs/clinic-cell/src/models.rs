// libs/clinic-cell/src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;

// ==============================================================================
// CLINIC SETTINGS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(rename = "calendarId", default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub working_hours: Option<String>,
}

/// One row of `user_settings`, keyed by the clinic owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    #[serde(default)]
    pub doctor_details: Vec<Doctor>,
    /// Google service-account credentials for the clinic's calendars.
    #[serde(default)]
    pub calendar_auth: Option<Value>,
    #[serde(default)]
    pub agent_phone: Option<String>,
    #[serde(default)]
    pub working_hours: Option<String>,
    #[serde(default)]
    pub lunch_hours: Option<String>,
}

impl UserSettings {
    /// Exact name match first, then a case-insensitive one; callers often
    /// say "dr. rao" where the settings say "Dr. Rao".
    pub fn find_doctor(&self, name: &str) -> Option<&Doctor> {
        let wanted = name.trim();
        self.doctor_details
            .iter()
            .find(|d| d.name == wanted)
            .or_else(|| {
                self.doctor_details
                    .iter()
                    .find(|d| d.name.eq_ignore_ascii_case(wanted))
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicProfileRow {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserIdRow {
    pub user_id: Option<String>,
}

// ==============================================================================
// REQUEST BODIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPhoneLookupRequest {
    pub agent_phone: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("No settings found for clinic {0}")]
    SettingsNotFound(String),

    #[error("Invalid clinic data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ClinicError> for AppError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::SettingsNotFound(msg) => AppError::NotFound(msg),
            ClinicError::InvalidData(msg) => AppError::Internal(msg),
            ClinicError::Database(e) => e.into(),
        }
    }
}
