// libs/voice-agent-cell/src/services/health.rs
use std::sync::Arc;
use std::time::Duration;

use monitoring_cell::{HealthMonitorService, HttpProbe};
use session_registry_cell::{RegistryProbe, SessionRegistry};
use shared_config::AppConfig;

use crate::services::livekit::LiveKitProbe;

/// Readiness for the worker: the voice provider, the backend and the
/// session registry.
pub fn worker_health_monitor(config: &AppConfig, registry: Arc<dyn SessionRegistry>) -> HealthMonitorService {
    HealthMonitorService::new(
        config.role.service_name(),
        Duration::from_millis(config.health_probe_timeout_ms),
    )
    .with_probe(Arc::new(LiveKitProbe::new(config)))
    .with_probe(Arc::new(HttpProbe::backend(config)))
    .with_probe(Arc::new(RegistryProbe::new(registry)))
}
