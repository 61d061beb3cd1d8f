// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::json;
use tracing::info;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::tool::ToolResponse;
use shared_utils::extractor::CallIdentity;

use crate::models::{
    AppointmentDetailsQuery, AvailableSlotsRequest, CancelAppointmentRequest, CheckAvailabilityRequest,
    ListAppointmentsRequest, RescheduleAppointmentRequest, ScheduleAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::lookup::AppointmentLookupService;

// ==============================================================================
// BOOKING TOOLS
// ==============================================================================

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let outcome = service
        .schedule_appointment(&identity.user_id, &identity.call_id, request)
        .await?;

    info!("schedule_appointment on call {}: {:?}", identity.call_id, outcome);
    Ok(Json(ToolResponse::text(outcome.message())))
}

#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(request): Json<CheckAvailabilityRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let outcome = service.check_availability(&identity.user_id, request).await?;

    Ok(Json(ToolResponse::text(outcome.message())))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let outcome = service.reschedule_appointment(&identity.user_id, request).await?;

    info!("reschedule_appointment on call {}: {:?}", identity.call_id, outcome);
    Ok(Json(ToolResponse::text(outcome.message())))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let outcome = service.cancel_appointment(&identity.user_id, request).await?;

    info!("cancel_appointment on call {}: {:?}", identity.call_id, outcome);
    Ok(Json(ToolResponse::text(outcome.message())))
}

// ==============================================================================
// LOOKUPS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(request): Json<AvailableSlotsRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = AppointmentLookupService::new(&state);
    let slots = service.get_available_slots(&identity.user_id, request).await?;

    Ok(Json(ToolResponse::new(json!(slots))))
}

#[axum::debug_handler]
pub async fn get_appointment_details(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(query): Json<AppointmentDetailsQuery>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = AppointmentLookupService::new(&state);
    let appointments = service.get_appointment_details(&identity.user_id, query).await?;

    Ok(Json(ToolResponse::new(json!(appointments))))
}

#[axum::debug_handler]
pub async fn list_appointments_for_patient(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(request): Json<ListAppointmentsRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = AppointmentLookupService::new(&state);
    let appointments = service
        .list_appointments_for_patient(&identity.user_id, request)
        .await?;

    Ok(Json(ToolResponse::new(json!(appointments))))
}
