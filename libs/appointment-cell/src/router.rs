// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/schedule_appointment", post(handlers::schedule_appointment))
        .route("/check_availability", post(handlers::check_availability))
        .route("/reschedule_appointment", post(handlers::reschedule_appointment))
        .route("/cancel_appointment", post(handlers::cancel_appointment))
        .route("/get_available_slots", post(handlers::get_available_slots))
        .route("/get_appointment_details", post(handlers::get_appointment_details))
        .route("/list_appointments_for_patient", post(handlers::list_appointments_for_patient))
        .with_state(state)
}
