// =====================================================================================
// MONITORING CELL ROUTER
// =====================================================================================

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handlers::{get_component_health, get_health_status, get_liveness, MonitoringHandlers};
use crate::services::HealthMonitorService;

pub fn create_monitoring_router(health_service: Arc<HealthMonitorService>) -> Router {
    let handlers = Arc::new(MonitoringHandlers::new(health_service));

    Router::new()
        .route("/health", get(get_health_status))
        .route("/health/live", get(get_liveness))
        .route("/health/component", get(get_component_health))
        .with_state(handlers)
}
