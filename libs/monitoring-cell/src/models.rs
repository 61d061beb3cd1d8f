// =====================================================================================
// MONITORING CELL MODELS
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Result of probing one dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub last_checked: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: String,
    pub uptime_seconds: u64,
    pub components: Vec<HealthCheck>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn unhealthy_components(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| !c.status.is_healthy())
            .map(|c| c.component.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub service: String,
    pub uptime_seconds: u64,
}

// Request/Response models
#[derive(Debug, Deserialize)]
pub struct ComponentQuery {
    pub component: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitoringError {
    #[error("Component name required")]
    MissingComponent,
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
    #[error("Health endpoint unreachable: {0}")]
    Unreachable(String),
}
