// libs/call-history-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn call_history_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/add_call_history", post(handlers::add_call_history))
        .route("/summarize_call", post(handlers::summarize_call))
        .with_state(state)
}
