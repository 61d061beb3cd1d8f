// libs/voice-agent-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_models::error::AppError;
use shared_models::tool::ToolResponse;

use crate::models::{
    CloseReason, EndOutcome, EndSessionRequest, SessionSnapshot, TranscriptLine, WebhookOutcome,
};
use crate::services::livekit::{action_for, LiveKitWebhooks, WebhookAction};
use crate::services::SessionManager;

pub struct VoiceAgentHandlers {
    sessions: Arc<SessionManager>,
    webhooks: LiveKitWebhooks,
}

impl VoiceAgentHandlers {
    pub fn new(sessions: Arc<SessionManager>, webhooks: LiveKitWebhooks) -> Self {
        Self { sessions, webhooks }
    }
}

fn end_status(outcome: &EndOutcome) -> StatusCode {
    match outcome {
        EndOutcome::Closed { .. } => StatusCode::OK,
        EndOutcome::Forwarded { .. } => StatusCode::ACCEPTED,
    }
}

#[axum::debug_handler]
pub async fn livekit_webhook(
    State(handlers): State<Arc<VoiceAgentHandlers>>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<WebhookOutcome>), AppError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let event = handlers.webhooks.verify(&body, authorization)?;

    match action_for(&event) {
        WebhookAction::Start(dispatch) => {
            let session = handlers.sessions.start_session(dispatch).await?;
            Ok((StatusCode::OK, Json(WebhookOutcome::Started { session })))
        }
        WebhookAction::End { session_id } => {
            let outcome = handlers
                .sessions
                .end_session(&session_id, CloseReason::RoomFinished)
                .await?;
            Ok((end_status(&outcome), Json(WebhookOutcome::Ended { outcome })))
        }
        WebhookAction::Ignore { event } => {
            debug!("Ignoring webhook {}", event);
            Ok((StatusCode::OK, Json(WebhookOutcome::Ignored { event })))
        }
    }
}

#[axum::debug_handler]
pub async fn list_sessions(
    State(handlers): State<Arc<VoiceAgentHandlers>>,
) -> Json<Vec<SessionSnapshot>> {
    Json(handlers.sessions.list_sessions().await)
}

#[axum::debug_handler]
pub async fn invoke_tool(
    State(handlers): State<Arc<VoiceAgentHandlers>>,
    Path((session_id, tool)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> Result<Json<ToolResponse>, AppError> {
    let args = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let response = handlers.sessions.invoke_tool(&session_id, &tool, args).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn record_transcript(
    State(handlers): State<Arc<VoiceAgentHandlers>>,
    Path(session_id): Path<String>,
    Json(line): Json<TranscriptLine>,
) -> Result<Json<Value>, AppError> {
    let lines = handlers.sessions.record_transcript(&session_id, line).await?;
    Ok(Json(json!({ "session_id": session_id, "transcript_lines": lines })))
}

#[axum::debug_handler]
pub async fn end_session(
    State(handlers): State<Arc<VoiceAgentHandlers>>,
    Path(session_id): Path<String>,
    body: Option<Json<EndSessionRequest>>,
) -> Result<(StatusCode, Json<EndOutcome>), AppError> {
    if let Some(Json(EndSessionRequest { reason: Some(reason) })) = &body {
        info!("Ending {}: {}", session_id, reason);
    }

    let outcome = handlers.sessions.end_session(&session_id, CloseReason::Ended).await?;
    Ok((end_status(&outcome), Json(outcome)))
}
