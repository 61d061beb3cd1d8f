// libs/voice-agent-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{self, VoiceAgentHandlers};

pub fn voice_agent_routes(handlers: Arc<VoiceAgentHandlers>) -> Router {
    Router::new()
        .route("/livekit/webhook", post(handlers::livekit_webhook))
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/{id}/tools/{tool}", post(handlers::invoke_tool))
        .route("/sessions/{id}/transcript", post(handlers::record_transcript))
        .route("/sessions/{id}/end", post(handlers::end_session))
        .with_state(handlers)
}
