// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use call_history_cell::services::CallHistoryService;
use clinic_cell::hours::{check_clinic_hours, parse_working_hours};
use clinic_cell::models::{Doctor, UserSettings};
use clinic_cell::services::ClinicSettingsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::{db_time, parse_clock_time, parse_date};

use crate::models::{
    Appointment, AppointmentError, AppointmentId, AppointmentOutcome, AppointmentStatus, CancelAppointmentRequest,
    ChangeAction, CheckAvailabilityRequest, NewAppointment, RescheduleAppointmentRequest,
    ScheduleAppointmentRequest,
};
use crate::services::calendar::CalendarSync;
use crate::services::slots::SlotFinder;
use crate::services::store::AppointmentStore;

/// Id allocation is retried when another booking takes the same number.
pub const MAX_ID_ATTEMPTS: u32 = 3;

const BOOKED_CALL_STATUS: &str = "Booked";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotVerdict {
    Free,
    OutsideHours,
    Taken,
}

/// The slot a call is trying to book.
struct BookingSlot<'a> {
    call_id: &'a str,
    patient_name: &'a str,
    doctor: &'a Doctor,
    date: NaiveDate,
    time: NaiveTime,
}

pub struct AppointmentBookingService {
    store: AppointmentStore,
    clinic: ClinicSettingsService,
    call_history: CallHistoryService,
    calendar: CalendarSync,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            store: AppointmentStore::new(Arc::clone(&supabase)),
            clinic: ClinicSettingsService::with_client(Arc::clone(&supabase)),
            call_history: CallHistoryService::with_client(supabase),
            calendar: CalendarSync::new(config),
        }
    }

    // ==============================================================================
    // SLOT CHECKS
    // ==============================================================================

    /// Clinic hours and lunch first, then the doctor's own hours, then
    /// existing bookings. `ignore` lets a reschedule keep its own slot.
    async fn slot_verdict(
        &self,
        user_id: &Uuid,
        settings: &UserSettings,
        doctor: &Doctor,
        date: NaiveDate,
        time: NaiveTime,
        ignore: Option<&str>,
    ) -> Result<SlotVerdict, AppointmentError> {
        let clinic_hours = check_clinic_hours(settings, date, time);
        if !clinic_hours.is_open() {
            debug!("Clinic check for {} {}: {:?}", date, db_time(&time), clinic_hours);
            return Ok(SlotVerdict::OutsideHours);
        }

        if let Some(hours_text) = doctor.working_hours.as_deref() {
            let works = parse_working_hours(hours_text, date)
                .map(|hours| hours.admits_start(time))
                .unwrap_or(false);
            if !works {
                debug!("{} does not work at {} on {}", doctor.name, db_time(&time), date);
                return Ok(SlotVerdict::OutsideHours);
            }
        }

        let holders = self.store.slot_holders(user_id, &doctor.name, date, time).await?;
        if holders.iter().any(|id| Some(id.as_str()) != ignore) {
            return Ok(SlotVerdict::Taken);
        }

        Ok(SlotVerdict::Free)
    }

    async fn alternatives(
        &self,
        user_id: &Uuid,
        settings: &UserSettings,
        doctor: &Doctor,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, AppointmentError> {
        Ok(SlotFinder::new(&self.store)
            .available_slots(user_id, settings, doctor, date)
            .await?)
    }

    async fn outside_hours(
        &self,
        user_id: &Uuid,
        settings: &UserSettings,
        doctor: &Doctor,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<AppointmentOutcome, AppointmentError> {
        let alternatives = self.alternatives(user_id, settings, doctor, date).await?;
        if alternatives.is_empty() {
            return Ok(AppointmentOutcome::NotWorking {
                doctor: doctor.name.clone(),
                date,
            });
        }

        Ok(AppointmentOutcome::OutsideHours {
            doctor: doctor.name.clone(),
            date,
            time,
            alternatives,
        })
    }

    async fn slot_taken(
        &self,
        user_id: &Uuid,
        settings: &UserSettings,
        doctor: &Doctor,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<AppointmentOutcome, AppointmentError> {
        Ok(AppointmentOutcome::SlotTaken {
            doctor: doctor.name.clone(),
            date,
            time,
            alternatives: self.alternatives(user_id, settings, doctor, date).await?,
        })
    }

    async fn sync_new_event(&self, settings: &UserSettings, appointment: &Appointment) {
        let Some(appointment_id) = appointment.appointment_id.as_deref() else {
            return;
        };

        match self.calendar.add_event(settings, appointment).await {
            Ok(Some(event_id)) => {
                if let Err(e) = self.store.set_event_id(appointment_id, &event_id).await {
                    warn!("Could not store calendar event id for {}: {}", appointment_id, e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Calendar event for {} not created: {:#}", appointment_id, e),
        }
    }

    /// A slot held by this call's own booking for the same patient is a
    /// repeat of that booking, not a conflict.
    async fn taken_or_repeat(
        &self,
        user_id: &Uuid,
        settings: &UserSettings,
        slot: &BookingSlot<'_>,
    ) -> Result<AppointmentOutcome, AppointmentError> {
        if let Some(existing) = self
            .store
            .find_duplicate(slot.call_id, slot.patient_name, &slot.doctor.name, slot.date, slot.time)
            .await?
        {
            info!("Call {} already booked {:?}", slot.call_id, existing.appointment_id);
            return Ok(AppointmentOutcome::Duplicate {
                appointment_id: existing.appointment_id,
            });
        }
        self.slot_taken(user_id, settings, slot.doctor, slot.date, slot.time).await
    }

    async fn remove_event(&self, settings: &UserSettings, appointment: &Appointment) {
        if let Err(e) = self.calendar.remove_event(settings, appointment).await {
            warn!(
                "Calendar event for {} not removed: {:#}",
                appointment.appointment_id.as_deref().unwrap_or("?"),
                e
            );
        }
    }

    // ==============================================================================
    // TOOLS
    // ==============================================================================

    #[instrument(skip(self, request), fields(doctor = %request.assigned_doctor))]
    pub async fn schedule_appointment(
        &self,
        user_id: &Uuid,
        call_id: &str,
        request: ScheduleAppointmentRequest,
    ) -> Result<AppointmentOutcome, AppointmentError> {
        let patient_name = request.patient_name.trim();
        if patient_name.is_empty() {
            return Err(AppointmentError::ValidationError("patient_name must not be empty".to_string()));
        }
        let date = parse_date(&request.appointment_date)?;
        let time = parse_clock_time(&request.appointment_time)?;

        let settings = self.clinic.require_user_settings(user_id).await?;
        let Some(doctor) = settings.find_doctor(&request.assigned_doctor).cloned() else {
            return Ok(AppointmentOutcome::UnknownDoctor {
                doctor: request.assigned_doctor,
            });
        };

        let slot = BookingSlot { call_id, patient_name, doctor: &doctor, date, time };

        match self.slot_verdict(user_id, &settings, &doctor, date, time, None).await? {
            SlotVerdict::OutsideHours => return self.outside_hours(user_id, &settings, &doctor, date, time).await,
            SlotVerdict::Taken => return self.taken_or_repeat(user_id, &settings, &slot).await,
            SlotVerdict::Free => {}
        }

        let Some(prefix) = self.clinic.get_clinic_prefix(user_id).await? else {
            return Ok(AppointmentOutcome::NoClinicPrefix);
        };

        let mut attempt = 0;
        let appointment = loop {
            attempt += 1;
            let number = self.store.last_appointment_number(&prefix).await? + 1;
            let new_appointment = NewAppointment {
                appointment_id: AppointmentId::new(&prefix, number).to_string(),
                patient_name: patient_name.to_string(),
                appointment_reason: request.appointment_reason.trim().to_string(),
                appointment_date: date,
                appointment_time: time,
                assigned_doctor: doctor.name.clone(),
                user_id: user_id.to_string(),
                call_id: call_id.to_string(),
                current_status: AppointmentStatus::Scheduled,
            };

            match self.store.insert(&new_appointment).await {
                Ok(appointment) => break appointment,
                Err(e) if e.is_unique_violation() && e.conflict_mentions("appointment_id") => {
                    if attempt >= MAX_ID_ATTEMPTS {
                        return Err(AppointmentError::IdAllocationExhausted(prefix));
                    }
                    warn!(
                        "Appointment id {} taken concurrently, retrying ({}/{})",
                        new_appointment.appointment_id, attempt, MAX_ID_ATTEMPTS
                    );
                }
                Err(e) if e.is_unique_violation() => {
                    info!("Slot {} {} for {} taken concurrently", date, db_time(&time), doctor.name);
                    return self.taken_or_repeat(user_id, &settings, &slot).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let appointment_id = appointment
            .appointment_id
            .clone()
            .unwrap_or_default();
        info!("Appointment {} scheduled with {}", appointment_id, doctor.name);

        self.call_history
            .mark_appointment_status(call_id, BOOKED_CALL_STATUS)
            .await;
        self.sync_new_event(&settings, &appointment).await;

        Ok(AppointmentOutcome::Scheduled { appointment_id })
    }

    #[instrument(skip(self, request), fields(doctor = %request.doctor_name))]
    pub async fn check_availability(
        &self,
        user_id: &Uuid,
        request: CheckAvailabilityRequest,
    ) -> Result<AppointmentOutcome, AppointmentError> {
        let date = parse_date(&request.appointment_date)?;
        let time = parse_clock_time(&request.appointment_time)?;

        let settings = self.clinic.require_user_settings(user_id).await?;
        let Some(doctor) = settings.find_doctor(&request.doctor_name).cloned() else {
            return Ok(AppointmentOutcome::UnknownDoctor {
                doctor: request.doctor_name,
            });
        };

        let outcome = match self.slot_verdict(user_id, &settings, &doctor, date, time, None).await? {
            SlotVerdict::OutsideHours => AppointmentOutcome::OutsideHours {
                doctor: doctor.name,
                date,
                time,
                alternatives: Vec::new(),
            },
            SlotVerdict::Taken => AppointmentOutcome::Unavailable {
                doctor: doctor.name,
                date,
                time,
            },
            SlotVerdict::Free => AppointmentOutcome::Available {
                doctor: doctor.name,
                date,
                time,
            },
        };
        Ok(outcome)
    }

    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    pub async fn reschedule_appointment(
        &self,
        user_id: &Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<AppointmentOutcome, AppointmentError> {
        let appointment_id = request.appointment_id.trim().to_string();
        let date = parse_date(&request.new_date)?;
        let time = parse_clock_time(&request.new_time)?;

        let Some(current) = self.store.find(user_id, &appointment_id).await? else {
            return Ok(AppointmentOutcome::NotFound {
                appointment_id,
                action: ChangeAction::Reschedule,
            });
        };
        if current.current_status == AppointmentStatus::Cancelled {
            return Ok(AppointmentOutcome::AlreadyCancelled { appointment_id });
        }

        let settings = self.clinic.require_user_settings(user_id).await?;
        let Some(doctor) = settings.find_doctor(&current.assigned_doctor).cloned() else {
            return Ok(AppointmentOutcome::UnknownDoctor {
                doctor: current.assigned_doctor,
            });
        };

        match self
            .slot_verdict(user_id, &settings, &doctor, date, time, Some(&appointment_id))
            .await?
        {
            SlotVerdict::OutsideHours => return self.outside_hours(user_id, &settings, &doctor, date, time).await,
            SlotVerdict::Taken => return self.slot_taken(user_id, &settings, &doctor, date, time).await,
            SlotVerdict::Free => {}
        }

        let updated = match self.store.reschedule_if_unchanged(user_id, &current, date, time).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                warn!("Appointment {} changed before it could be rescheduled", appointment_id);
                return Ok(AppointmentOutcome::Conflict { appointment_id });
            }
            Err(e) if e.is_unique_violation() => {
                return self.slot_taken(user_id, &settings, &doctor, date, time).await;
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Appointment {} moved from {} {} to {} {}",
            appointment_id,
            current.appointment_date,
            db_time(&current.appointment_time),
            date,
            db_time(&time)
        );

        self.remove_event(&settings, &current).await;
        self.sync_new_event(&settings, &updated).await;

        Ok(AppointmentOutcome::Rescheduled { appointment_id })
    }

    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    pub async fn cancel_appointment(
        &self,
        user_id: &Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<AppointmentOutcome, AppointmentError> {
        let appointment_id = request.appointment_id.trim().to_string();

        let Some(current) = self.store.find(user_id, &appointment_id).await? else {
            return Ok(AppointmentOutcome::NotFound {
                appointment_id,
                action: ChangeAction::Cancel,
            });
        };
        if !current.current_status.can_transition_to(AppointmentStatus::Cancelled) {
            return Ok(AppointmentOutcome::AlreadyCancelled { appointment_id });
        }

        if self.store.cancel_if_unchanged(user_id, &current).await?.is_none() {
            warn!("Appointment {} changed before it could be cancelled", appointment_id);
            return Ok(AppointmentOutcome::Conflict { appointment_id });
        }

        info!("Appointment {} cancelled", appointment_id);

        match self.clinic.get_user_settings(user_id).await {
            Ok(Some(settings)) => self.remove_event(&settings, &current).await,
            Ok(None) => {}
            Err(e) => warn!("Skipping calendar cleanup for {}: {}", appointment_id, e),
        }

        Ok(AppointmentOutcome::Cancelled { appointment_id })
    }
}
