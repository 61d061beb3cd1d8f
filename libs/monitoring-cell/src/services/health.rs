// =====================================================================================
// HEALTH MONITORING SERVICE
// =====================================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{HealthCheck, HealthReport, HealthStatus, LivenessResponse};
use crate::services::probe::{DependencyProbe, HttpProbe, SupabaseProbe};

pub struct HealthMonitorService {
    service: String,
    started_at: Instant,
    probe_timeout: Duration,
    probes: Vec<Arc<dyn DependencyProbe>>,
}

impl HealthMonitorService {
    pub fn new(service: &str, probe_timeout: Duration) -> Self {
        Self {
            service: service.to_string(),
            started_at: Instant::now(),
            probe_timeout,
            probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn DependencyProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Readiness for the tool backend: the database and the summary model.
    pub fn for_backend(config: &AppConfig) -> Self {
        Self::new(config.role.service_name(), Duration::from_millis(config.health_probe_timeout_ms))
            .with_probe(Arc::new(SupabaseProbe::new(config)))
            .with_probe(Arc::new(HttpProbe::gemini(config)))
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn liveness(&self) -> LivenessResponse {
        LivenessResponse {
            status: "alive",
            service: self.service.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Runs every probe concurrently. One unhealthy component makes the whole
    /// report unhealthy.
    pub async fn check_all(&self) -> HealthReport {
        let components = join_all(self.probes.iter().map(|probe| self.run_probe(probe.as_ref()))).await;

        let status = if components.iter().all(|c| c.status.is_healthy()) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            service: self.service.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            components,
            timestamp: Utc::now(),
        }
    }

    pub async fn check_component(&self, name: &str) -> Option<HealthCheck> {
        let probe = self.probes.iter().find(|p| p.name() == name)?;
        Some(self.run_probe(probe.as_ref()).await)
    }

    async fn run_probe(&self, probe: &dyn DependencyProbe) -> HealthCheck {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.probe_timeout, probe.check()).await;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let error_message = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("timed out after {}ms", self.probe_timeout.as_millis())),
        };

        match &error_message {
            None => debug!("{} healthy in {}ms", probe.name(), response_time_ms),
            Some(e) => warn!("{} unhealthy: {}", probe.name(), e),
        }

        HealthCheck {
            component: probe.name().to_string(),
            status: if error_message.is_none() { HealthStatus::Healthy } else { HealthStatus::Unhealthy },
            response_time_ms,
            last_checked: Utc::now(),
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    struct FixedProbe {
        name: &'static str,
        healthy: bool,
        delay: Duration,
    }

    #[async_trait]
    impl DependencyProbe for FixedProbe {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            if !self.healthy {
                bail!("{} refused the connection", self.name);
            }
            Ok(())
        }
    }

    fn probe(name: &'static str, healthy: bool, delay_ms: u64) -> Arc<dyn DependencyProbe> {
        Arc::new(FixedProbe { name, healthy, delay: Duration::from_millis(delay_ms) })
    }

    #[tokio::test]
    async fn test_no_probes_is_healthy() {
        let service = HealthMonitorService::new("mcp-server", Duration::from_millis(100));
        let report = service.check_all().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.components.is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_makes_report_unhealthy() {
        let service = HealthMonitorService::new("mcp-server", Duration::from_millis(500))
            .with_probe(probe("supabase", true, 0))
            .with_probe(probe("gemini", false, 0));

        let report = service.check_all().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.unhealthy_components(), vec!["gemini"]);
        assert_eq!(
            report.components[1].error_message.as_deref(),
            Some("gemini refused the connection")
        );
    }

    #[tokio::test]
    async fn test_slow_probe_is_bounded_by_timeout() {
        let service = HealthMonitorService::new("voice-worker", Duration::from_millis(50))
            .with_probe(probe("livekit", true, 5_000));

        let started = Instant::now();
        let report = service.check_all().await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.components[0].error_message.as_deref(), Some("timed out after 50ms"));
    }

    #[tokio::test]
    async fn test_check_component_by_name() {
        let service = HealthMonitorService::new("mcp-server", Duration::from_millis(500))
            .with_probe(probe("supabase", true, 0));

        assert!(service.check_component("supabase").await.is_some());
        assert!(service.check_component("redis").await.is_none());
    }
}
