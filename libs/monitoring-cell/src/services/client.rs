// =====================================================================================
// HEALTHCHECK CLIENT
// =====================================================================================

use std::time::Duration;

use reqwest::Client;

use crate::models::{HealthReport, MonitoringError};

/// Asks a running service for its readiness report. Used by the container
/// healthcheck subcommand.
pub async fn fetch_health(base_url: &str, timeout: Duration) -> Result<HealthReport, MonitoringError> {
    let url = format!("{}/health", base_url.trim_end_matches('/'));

    let response = Client::new()
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| MonitoringError::Unreachable(e.to_string()))?;

    // 503 still carries the report body.
    response
        .json::<HealthReport>()
        .await
        .map_err(|e| MonitoringError::Unreachable(format!("invalid health body from {}: {}", url, e)))
}
