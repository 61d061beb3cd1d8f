pub mod client;
pub mod health;
pub mod probe;

pub use client::fetch_health;
pub use health::HealthMonitorService;
pub use probe::{DependencyProbe, HttpProbe, SupabaseProbe};
