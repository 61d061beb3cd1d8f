// libs/appointment-cell/src/services/store.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_database::DatabaseError;
use shared_utils::time::{db_time, parse_clock_time};

use crate::models::{
    Appointment, AppointmentIdRow, AppointmentId, AppointmentStatus, AppointmentTimeRow, NewAppointment,
};

const TABLE: &str = "/rest/v1/appointment_details";

fn enc(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// PostgREST access to `appointment_details`. Writes that depend on the
/// current state of a row are conditional updates; an empty result means the
/// row moved underneath the caller.
pub struct AppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn slot_filter(user_id: &Uuid, doctor: &str, date: NaiveDate) -> String {
        format!(
            "user_id=eq.{}&assigned_doctor=eq.{}&appointment_date=eq.{}&current_status=eq.{}",
            user_id,
            enc(doctor),
            date,
            AppointmentStatus::Scheduled
        )
    }

    /// Scheduled start times for a doctor on one day.
    pub async fn booked_times(&self, user_id: &Uuid, doctor: &str, date: NaiveDate) -> Result<Vec<NaiveTime>, DatabaseError> {
        let path = format!(
            "{}?{}&select=appointment_time",
            TABLE,
            Self::slot_filter(user_id, doctor, date)
        );
        let rows: Vec<AppointmentTimeRow> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match parse_clock_time(&row.appointment_time) {
                Ok(time) => Some(time),
                Err(_) => {
                    warn!("Ignoring unreadable appointment_time '{}'", row.appointment_time);
                    None
                }
            })
            .collect())
    }

    /// Ids of scheduled appointments holding the slot.
    pub async fn slot_holders(
        &self,
        user_id: &Uuid,
        doctor: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<String>, DatabaseError> {
        let path = format!(
            "{}?{}&appointment_time=eq.{}&select=appointment_id",
            TABLE,
            Self::slot_filter(user_id, doctor, date),
            db_time(&time)
        );
        let rows: Vec<AppointmentIdRow> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows.into_iter().filter_map(|r| r.appointment_id).collect())
    }

    /// A scheduled booking this call already made for the same patient and slot.
    #[instrument(skip(self))]
    pub async fn find_duplicate(
        &self,
        call_id: &str,
        patient_name: &str,
        doctor: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!(
            "{}?call_id=eq.{}&patient_name=eq.{}&assigned_doctor=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&current_status=eq.{}&limit=1",
            TABLE,
            enc(call_id),
            enc(patient_name),
            enc(doctor),
            date,
            db_time(&time),
            AppointmentStatus::Scheduled
        );
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    /// Highest number already used with `prefix`, or 0.
    pub async fn last_appointment_number(&self, prefix: &str) -> Result<u32, DatabaseError> {
        let path = format!(
            "{}?appointment_id=like.{}&select=appointment_id",
            TABLE,
            enc(&format!("{}-*", prefix))
        );
        let rows: Vec<AppointmentIdRow> = self.supabase.request(Method::GET, &path, None).await?;

        let last = rows
            .iter()
            .filter_map(|row| row.appointment_id.as_deref())
            .filter_map(AppointmentId::parse)
            .filter(|id| id.prefix == prefix)
            .map(|id| id.number)
            .max()
            .unwrap_or(0);

        debug!("Last appointment number for {} is {}", prefix, last);
        Ok(last)
    }

    pub async fn insert(&self, appointment: &NewAppointment) -> Result<Appointment, DatabaseError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| DatabaseError::InvalidRequest(format!("unserializable appointment: {}", e)))?;
        let rows: Vec<Appointment> = self.supabase.request(Method::POST, TABLE, Some(body)).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Decode("appointment insert returned no rows".to_string()))
    }

    /// Appointment by id, scoped to the clinic owner.
    pub async fn find(&self, user_id: &Uuid, appointment_id: &str) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!(
            "{}?appointment_id=eq.{}&user_id=eq.{}&limit=1",
            TABLE,
            enc(appointment_id),
            user_id
        );
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    fn guard(current: &Appointment, user_id: &Uuid) -> Option<String> {
        let appointment_id = current.appointment_id.as_deref()?;
        Some(format!(
            "{}?appointment_id=eq.{}&user_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&current_status=eq.{}",
            TABLE,
            enc(appointment_id),
            user_id,
            current.appointment_date,
            db_time(&current.appointment_time),
            current.current_status
        ))
    }

    /// Move `current` to a new slot if it is still exactly as read.
    /// `None` means another request changed it first.
    pub async fn reschedule_if_unchanged(
        &self,
        user_id: &Uuid,
        current: &Appointment,
        new_date: NaiveDate,
        new_time: NaiveTime,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let Some(path) = Self::guard(current, user_id) else {
            return Ok(None);
        };
        let body = json!({
            "appointment_date": new_date,
            "appointment_time": db_time(&new_time),
            "event_id": null,
        });
        let rows: Vec<Appointment> = self.supabase.request(Method::PATCH, &path, Some(body)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn cancel_if_unchanged(
        &self,
        user_id: &Uuid,
        current: &Appointment,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let Some(path) = Self::guard(current, user_id) else {
            return Ok(None);
        };
        let body = json!({ "current_status": AppointmentStatus::Cancelled });
        let rows: Vec<Appointment> = self.supabase.request(Method::PATCH, &path, Some(body)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn set_event_id(&self, appointment_id: &str, event_id: &str) -> Result<(), DatabaseError> {
        let path = format!("{}?appointment_id=eq.{}", TABLE, enc(appointment_id));
        let _: Vec<Appointment> = self
            .supabase
            .request(Method::PATCH, &path, Some(json!({ "event_id": event_id })))
            .await?;
        Ok(())
    }

    pub async fn search(
        &self,
        user_id: &Uuid,
        patient_name: Option<&str>,
        doctor: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let mut path = format!("{}?user_id=eq.{}", TABLE, user_id);
        if let Some(patient) = patient_name {
            path.push_str(&format!("&patient_name=eq.{}", enc(patient)));
        }
        if let Some(doctor) = doctor {
            path.push_str(&format!("&assigned_doctor=eq.{}", enc(doctor)));
        }
        if let Some(date) = date {
            path.push_str(&format!("&appointment_date=eq.{}", date));
        }
        path.push_str("&order=appointment_date.asc,appointment_time.asc");

        self.supabase.request(Method::GET, &path, None).await
    }

    /// Scheduled appointments for a patient on or after `from`.
    pub async fn upcoming_for_patient(
        &self,
        user_id: &Uuid,
        patient_name: &str,
        from: NaiveDate,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let path = format!(
            "{}?user_id=eq.{}&patient_name=eq.{}&appointment_date=gte.{}&current_status=eq.{}&order=appointment_date.asc,appointment_time.asc",
            TABLE,
            user_id,
            enc(patient_name),
            from,
            AppointmentStatus::Scheduled
        );
        self.supabase.request(Method::GET, &path, None).await
    }
}
