// libs/appointment-cell/src/services/slots.rs
use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use clinic_cell::hours::{lunch_break, parse_working_hours, DailyHours};
use clinic_cell::models::{Doctor, UserSettings};
use shared_database::DatabaseError;
use shared_utils::time::now_ist;

use crate::services::store::AppointmentStore;

pub const SLOT_MINUTES: i64 = 30;
pub const MAX_SUGGESTED_SLOTS: usize = 4;

/// Free starts on a 30-minute grid from the opening time while the start is
/// before closing. Booked starts, lunch and anything not after `not_before`
/// are skipped.
pub fn compute_available_slots(
    hours: DailyHours,
    lunch: Option<DailyHours>,
    booked: &[NaiveTime],
    not_before: Option<NaiveTime>,
    limit: usize,
) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    let mut current = hours.start;

    while current < hours.end && slots.len() < limit {
        let in_lunch = lunch.map(|l| l.contains(current)).unwrap_or(false);
        let past = not_before.map(|t| current <= t).unwrap_or(false);

        if !in_lunch && !past && !booked.contains(&current) {
            slots.push(current);
        }

        let (next, wrapped) = current.overflowing_add_signed(Duration::minutes(SLOT_MINUTES));
        if wrapped != 0 {
            break;
        }
        current = next;
    }

    slots
}

pub struct SlotFinder<'a> {
    store: &'a AppointmentStore,
}

impl<'a> SlotFinder<'a> {
    pub fn new(store: &'a AppointmentStore) -> Self {
        Self { store }
    }

    /// Up to four open slots for the doctor on `date`. Past days have none.
    pub async fn available_slots(
        &self,
        user_id: &Uuid,
        settings: &UserSettings,
        doctor: &Doctor,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, DatabaseError> {
        let Some(hours) = doctor
            .working_hours
            .as_deref()
            .and_then(|hours_text| parse_working_hours(hours_text, date))
        else {
            debug!("{} does not work on {}", doctor.name, date);
            return Ok(Vec::new());
        };

        let now = now_ist();
        let not_before = match date.cmp(&now.date_naive()) {
            std::cmp::Ordering::Less => return Ok(Vec::new()),
            std::cmp::Ordering::Equal => Some(now.time()),
            std::cmp::Ordering::Greater => None,
        };

        let booked = self.store.booked_times(user_id, &doctor.name, date).await?;
        let slots = compute_available_slots(
            hours,
            lunch_break(settings, date),
            &booked,
            not_before,
            MAX_SUGGESTED_SLOTS,
        );

        debug!("{} open slots for {} on {}", slots.len(), doctor.name, date);
        Ok(slots)
    }
}
