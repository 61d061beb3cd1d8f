// libs/clinic-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::tool::ToolResponse;
use shared_utils::extractor::{CallId, CallIdentity};

use crate::models::AgentPhoneLookupRequest;
use crate::services::settings::ClinicSettingsService;

#[axum::debug_handler]
pub async fn get_user_settings(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
) -> Result<Json<ToolResponse>, AppError> {
    let service = ClinicSettingsService::new(&state);
    let settings = service.get_user_settings(&identity.user_id).await?;

    Ok(Json(ToolResponse::new(json!(settings))))
}

#[axum::debug_handler]
pub async fn get_doctor_details_for_user(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
) -> Result<Json<ToolResponse>, AppError> {
    let service = ClinicSettingsService::new(&state);
    let doctors = service.get_doctor_details(&identity.user_id).await?;

    Ok(Json(ToolResponse::new(json!(doctors))))
}

#[axum::debug_handler]
pub async fn get_user_id_by_agent_phone(
    State(state): State<Arc<AppConfig>>,
    CallId(call_id): CallId,
    Json(request): Json<AgentPhoneLookupRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = ClinicSettingsService::new(&state);
    let user_id = service.get_user_id_by_agent_phone(&request.agent_phone).await?;

    info!(
        "Call {} to {} resolved to clinic {:?}",
        call_id, request.agent_phone, user_id
    );

    let result = match user_id {
        Some(id) => Value::String(id.to_string()),
        None => Value::Null,
    };
    Ok(Json(ToolResponse::new(result)))
}
