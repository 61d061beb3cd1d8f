// libs/call-history-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::tool::ToolResponse;
use shared_utils::extractor::CallIdentity;

use crate::models::{AddCallHistoryRequest, SummarizeCallRequest};
use crate::services::{CallHistoryService, CallSummarizer};

#[axum::debug_handler]
pub async fn add_call_history(
    State(state): State<Arc<AppConfig>>,
    identity: CallIdentity,
    Json(request): Json<AddCallHistoryRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let service = CallHistoryService::new(&state);
    let outcome = service
        .add_call_history(&identity.user_id, &identity.call_id, request)
        .await?;

    Ok(Json(ToolResponse::text(outcome.message())))
}

#[axum::debug_handler]
pub async fn summarize_call(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<SummarizeCallRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    let summarizer = CallSummarizer::new(&state);
    let summary = summarizer.summarize(&request.transcript).await?;

    Ok(Json(ToolResponse::text(summary)))
}
