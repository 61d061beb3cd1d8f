pub mod memory;
pub mod probe;
pub mod redis_registry;

use std::sync::Arc;

use tracing::{info, warn};

use shared_config::AppConfig;

use crate::{RegistryError, SessionRegistry};

pub use memory::InMemorySessionRegistry;
pub use probe::RegistryProbe;
pub use redis_registry::RedisSessionRegistry;

/// Redis when `REDIS_URL` is configured, otherwise a registry private to this
/// process.
pub async fn connect_registry(config: &AppConfig) -> Result<Arc<dyn SessionRegistry>, RegistryError> {
    match &config.redis_url {
        Some(url) => {
            let registry = RedisSessionRegistry::connect(url).await?;
            info!("Session registry backed by Redis");
            Ok(Arc::new(registry))
        }
        None => {
            warn!("REDIS_URL not set; using in-process session registry. Horizontal worker scaling requires REDIS_URL");
            Ok(Arc::new(InMemorySessionRegistry::new()))
        }
    }
}
