// libs/appointment-cell/src/services/lookup.rs
use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use clinic_cell::services::ClinicSettingsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::{db_time, parse_date, today_ist};

use crate::models::{
    Appointment, AppointmentDetailsQuery, AppointmentError, AvailableSlotsRequest, ListAppointmentsRequest,
};
use crate::services::slots::SlotFinder;
use crate::services::store::AppointmentStore;

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Read-only appointment queries.
pub struct AppointmentLookupService {
    store: AppointmentStore,
    clinic: ClinicSettingsService,
}

impl AppointmentLookupService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            store: AppointmentStore::new(Arc::clone(&supabase)),
            clinic: ClinicSettingsService::with_client(supabase),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_appointment_details(
        &self,
        user_id: &Uuid,
        query: AppointmentDetailsQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let date = non_blank(&query.appointment_date).map(parse_date).transpose()?;

        let appointments = self
            .store
            .search(
                user_id,
                non_blank(&query.patient_name),
                non_blank(&query.assigned_doctor),
                date,
            )
            .await?;

        debug!("{} appointments matched", appointments.len());
        Ok(appointments)
    }

    /// Upcoming scheduled appointments, today (clinic time) onwards.
    #[instrument(skip(self))]
    pub async fn list_appointments_for_patient(
        &self,
        user_id: &Uuid,
        request: ListAppointmentsRequest,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let patient_name = request.patient_name.trim();
        if patient_name.is_empty() {
            return Err(AppointmentError::ValidationError("patient_name must not be empty".to_string()));
        }

        Ok(self
            .store
            .upcoming_for_patient(user_id, patient_name, today_ist())
            .await?)
    }

    /// Open slots as `HH:MM:SS`. Unknown clinics and doctors have none.
    #[instrument(skip(self))]
    pub async fn get_available_slots(
        &self,
        user_id: &Uuid,
        request: AvailableSlotsRequest,
    ) -> Result<Vec<String>, AppointmentError> {
        let date = parse_date(&request.appointment_date)?;

        let Some(settings) = self.clinic.get_user_settings(user_id).await? else {
            return Ok(Vec::new());
        };
        let Some(doctor) = settings.find_doctor(&request.doctor_name) else {
            debug!("Doctor {} not configured", request.doctor_name);
            return Ok(Vec::new());
        };

        let slots = SlotFinder::new(&self.store)
            .available_slots(user_id, &settings, doctor, date)
            .await?;

        Ok(slots.iter().map(db_time).collect())
    }
}
