use std::sync::Arc;

use axum::{routing::get, Router};

use monitoring_cell::{create_monitoring_router, HealthMonitorService};
use voice_agent_cell::handlers::VoiceAgentHandlers;
use voice_agent_cell::router::voice_agent_routes;

pub fn create_router(handlers: Arc<VoiceAgentHandlers>, health: Arc<HealthMonitorService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic voice worker is running!" }))
        .merge(voice_agent_routes(handlers))
        .merge(create_monitoring_router(health))
}
