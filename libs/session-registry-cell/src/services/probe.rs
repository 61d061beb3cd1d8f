use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use monitoring_cell::DependencyProbe;

use crate::SessionRegistry;

pub const REGISTRY_COMPONENT: &str = "session_registry";

pub struct RegistryProbe {
    registry: Arc<dyn SessionRegistry>,
}

impl RegistryProbe {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DependencyProbe for RegistryProbe {
    fn name(&self) -> &str {
        REGISTRY_COMPONENT
    }

    async fn check(&self) -> Result<()> {
        self.registry.ping().await?;
        Ok(())
    }
}
