// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use clinic_cell::models::ClinicError;
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::time::{speech_time, TimeFormatError};

pub const SCHEDULED_MESSAGE: &str = "Appointment scheduled successfully.";
pub const RESCHEDULED_MESSAGE: &str = "Appointment rescheduled successfully.";
pub const CANCELLED_MESSAGE: &str = "Appointment cancelled successfully.";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A row of `appointment_details`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(default)]
    pub appointment_id: Option<String>,
    pub patient_name: String,
    #[serde(default)]
    pub appointment_reason: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub assigned_doctor: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub current_status: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Cancelled,
}

impl AppointmentStatus {
    /// Cancelled appointments are final.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!((self, next), (AppointmentStatus::Scheduled, _))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Clinic-prefixed appointment number, `SMI-000042`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentId {
    pub prefix: String,
    pub number: u32,
}

impl AppointmentId {
    pub fn new(prefix: &str, number: u32) -> Self {
        Self {
            prefix: prefix.to_string(),
            number,
        }
    }

    /// Ids that do not follow `PREFIX-digits` are ignored when numbering.
    pub fn parse(raw: &str) -> Option<Self> {
        let (prefix, digits) = raw.trim().split_once('-')?;
        if prefix.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse().ok()?;
        Some(Self::new(prefix, number))
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:06}", self.prefix, self.number)
    }
}

/// Insert body for a new appointment.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub appointment_id: String,
    pub patient_name: String,
    pub appointment_reason: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub assigned_doctor: String,
    pub user_id: String,
    pub call_id: String,
    pub current_status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentIdRow {
    pub appointment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentTimeRow {
    pub appointment_time: String,
}

// ==============================================================================
// TOOL REQUEST BODIES
// ==============================================================================

// Dates and times arrive as the model spoke them and are parsed by the services.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAppointmentRequest {
    pub patient_name: String,
    pub assigned_doctor: String,
    pub appointment_date: String,
    pub appointment_time: String,
    #[serde(default)]
    pub appointment_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub doctor_name: String,
    pub appointment_date: String,
    pub appointment_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub appointment_id: String,
    pub new_date: String,
    pub new_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub appointment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsRequest {
    pub doctor_name: String,
    pub appointment_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentDetailsQuery {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub assigned_doctor: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAppointmentsRequest {
    pub patient_name: String,
}

// ==============================================================================
// OUTCOMES
// ==============================================================================

/// Business result of an appointment tool call. Every variant is spoken back
/// to the caller, so none of them is an HTTP error.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentOutcome {
    Scheduled { appointment_id: String },
    /// Same call already booked this patient into this slot.
    Duplicate { appointment_id: Option<String> },
    Available { doctor: String, date: NaiveDate, time: NaiveTime },
    Unavailable { doctor: String, date: NaiveDate, time: NaiveTime },
    OutsideHours {
        doctor: String,
        date: NaiveDate,
        time: NaiveTime,
        alternatives: Vec<NaiveTime>,
    },
    NotWorking { doctor: String, date: NaiveDate },
    SlotTaken {
        doctor: String,
        date: NaiveDate,
        time: NaiveTime,
        alternatives: Vec<NaiveTime>,
    },
    UnknownDoctor { doctor: String },
    NoClinicPrefix,
    Rescheduled { appointment_id: String },
    Cancelled { appointment_id: String },
    NotFound { appointment_id: String, action: ChangeAction },
    AlreadyCancelled { appointment_id: String },
    /// A concurrent request changed the appointment first.
    Conflict { appointment_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Reschedule,
    Cancel,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Reschedule => write!(f, "rescheduling"),
            ChangeAction::Cancel => write!(f, "cancellation"),
        }
    }
}

fn openings(alternatives: &[NaiveTime]) -> String {
    alternatives.iter().map(speech_time).collect::<Vec<_>>().join(", ")
}

impl AppointmentOutcome {
    pub fn message(&self) -> String {
        match self {
            AppointmentOutcome::Scheduled { .. } | AppointmentOutcome::Duplicate { .. } => {
                SCHEDULED_MESSAGE.to_string()
            }
            AppointmentOutcome::Available { doctor, date, time } => {
                format!("Doctor {} is available at {} on {}.", doctor, speech_time(time), date)
            }
            AppointmentOutcome::Unavailable { doctor, date, time } => {
                format!("Doctor {} is not available at {} on {}.", doctor, speech_time(time), date)
            }
            AppointmentOutcome::OutsideHours { doctor, date, time, alternatives } if alternatives.is_empty() => {
                format!(
                    "Doctor {} is not available at {} on {} (outside working hours).",
                    doctor,
                    speech_time(time),
                    date
                )
            }
            AppointmentOutcome::OutsideHours { doctor, date, time, alternatives } => format!(
                "Doctor {} is not available at {} on {} (outside working hours). However, they have openings at: {}. Would any of these times work for you?",
                doctor,
                speech_time(time),
                date,
                openings(alternatives)
            ),
            AppointmentOutcome::NotWorking { doctor, date } => format!(
                "Doctor {} is not working on {}. Please choose a different date.",
                doctor, date
            ),
            AppointmentOutcome::SlotTaken { doctor, date, time, alternatives } if alternatives.is_empty() => format!(
                "Doctor {} is not available at {} on {}, and there are no other available slots on that day.",
                doctor,
                speech_time(time),
                date
            ),
            AppointmentOutcome::SlotTaken { doctor, date, time, alternatives } => format!(
                "Doctor {} is not available at {} on {}. However, they have openings at: {}. Would any of these times work for you?",
                doctor,
                speech_time(time),
                date,
                openings(alternatives)
            ),
            AppointmentOutcome::UnknownDoctor { doctor } => format!(
                "Doctor {} does not work at this clinic. Please choose one of the clinic's doctors.",
                doctor
            ),
            AppointmentOutcome::NoClinicPrefix => {
                "Failed to get clinic prefix for appointment ID generation.".to_string()
            }
            AppointmentOutcome::Rescheduled { .. } => RESCHEDULED_MESSAGE.to_string(),
            AppointmentOutcome::Cancelled { .. } => CANCELLED_MESSAGE.to_string(),
            AppointmentOutcome::NotFound { action, .. } => format!("Appointment not found for {}.", action),
            AppointmentOutcome::AlreadyCancelled { appointment_id } => {
                format!("Appointment {} has already been cancelled.", appointment_id)
            }
            AppointmentOutcome::Conflict { appointment_id } => format!(
                "Appointment {} was changed by another request. Please check its details and try again.",
                appointment_id
            ),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error(transparent)]
    InvalidTime(#[from] TimeFormatError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Could not allocate an appointment id for prefix {0}")]
    IdAllocationExhausted(String),

    #[error(transparent)]
    Clinic(#[from] ClinicError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::InvalidTime(e) => AppError::ValidationError(e.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::IdAllocationExhausted(prefix) => {
                AppError::Conflict(format!("Could not allocate an appointment id for prefix {}", prefix))
            }
            AppointmentError::Clinic(e) => e.into(),
            AppointmentError::Database(e) => e.into(),
        }
    }
}
