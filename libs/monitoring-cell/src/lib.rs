// =====================================================================================
// MONITORING CELL - DEPENDENCY HEALTH & READINESS
// =====================================================================================
//
// Readiness reporting shared by the tool backend and the voice worker:
// - Concurrent, timeout-bounded probes of every external dependency
// - Liveness and per-component endpoints
// - Client used by the container healthcheck subcommand
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use models::{HealthCheck, HealthReport, HealthStatus, MonitoringError};

pub use services::{fetch_health, DependencyProbe, HealthMonitorService, HttpProbe, SupabaseProbe};

pub use handlers::MonitoringHandlers;
pub use router::create_monitoring_router;
