// =====================================================================================
// MONITORING CELL HANDLERS
// =====================================================================================

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::models::{ComponentQuery, HealthCheck, HealthReport, LivenessResponse, MonitoringError};
use crate::services::HealthMonitorService;

pub struct MonitoringHandlers {
    health_service: Arc<HealthMonitorService>,
}

impl MonitoringHandlers {
    pub fn new(health_service: Arc<HealthMonitorService>) -> Self {
        Self { health_service }
    }
}

fn status_code(healthy: bool) -> StatusCode {
    if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

// =====================================================================================
// PUBLIC HEALTH CHECK ENDPOINTS
// =====================================================================================

/// Readiness: 200 only when every dependency answered in time.
#[instrument(skip(handlers))]
pub async fn get_health_status(
    State(handlers): State<Arc<MonitoringHandlers>>,
) -> (StatusCode, Json<HealthReport>) {
    let report = handlers.health_service.check_all().await;

    if !report.status.is_healthy() {
        warn!(
            "{} not ready, failing: {:?}",
            report.service,
            report.unhealthy_components()
        );
    }

    (status_code(report.status.is_healthy()), Json(report))
}

pub async fn get_liveness(
    State(handlers): State<Arc<MonitoringHandlers>>,
) -> Json<LivenessResponse> {
    Json(handlers.health_service.liveness())
}

#[instrument(skip(handlers))]
pub async fn get_component_health(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Query(params): Query<ComponentQuery>,
) -> Result<(StatusCode, Json<HealthCheck>), MonitoringError> {
    let component_name = params
        .component
        .filter(|c| !c.trim().is_empty())
        .ok_or(MonitoringError::MissingComponent)?;

    let health_check = handlers
        .health_service
        .check_component(&component_name)
        .await
        .ok_or_else(|| MonitoringError::UnknownComponent(component_name.clone()))?;

    Ok((status_code(health_check.status.is_healthy()), Json(health_check)))
}

// =====================================================================================
// ERROR RESPONSE IMPLEMENTATION
// =====================================================================================

impl IntoResponse for MonitoringError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            MonitoringError::MissingComponent => StatusCode::BAD_REQUEST,
            MonitoringError::UnknownComponent(_) => StatusCode::NOT_FOUND,
            MonitoringError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, Json(serde_json::json!({
            "error": self.to_string(),
            "timestamp": chrono::Utc::now()
        }))).into_response()
    }
}
