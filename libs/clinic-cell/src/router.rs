// libs/clinic-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/get_user_settings", post(handlers::get_user_settings))
        .route("/get_doctor_details_for_user", post(handlers::get_doctor_details_for_user))
        .route("/get_user_id_by_agent_phone", post(handlers::get_user_id_by_agent_phone))
        .with_state(state)
}
