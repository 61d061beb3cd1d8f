// =====================================================================================
// DEPENDENCY PROBES
// =====================================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

pub const SUPABASE_COMPONENT: &str = "supabase";
pub const GEMINI_COMPONENT: &str = "gemini";
pub const BACKEND_COMPONENT: &str = "mcp_server";

/// A reachability check against one external dependency. Implementations
/// must not mutate anything; the monitor bounds each call with its timeout.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> Result<()>;
}

pub struct SupabaseProbe {
    client: Arc<SupabaseClient>,
    timeout: Duration,
}

impl SupabaseProbe {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(SupabaseClient::new(config)),
            timeout: Duration::from_millis(config.health_probe_timeout_ms),
        }
    }
}

#[async_trait]
impl DependencyProbe for SupabaseProbe {
    fn name(&self) -> &str {
        SUPABASE_COMPONENT
    }

    async fn check(&self) -> Result<()> {
        self.client.ping(self.timeout).await?;
        Ok(())
    }
}

/// GET a URL and expect a 2xx.
pub struct HttpProbe {
    name: String,
    url: String,
    headers: Vec<(&'static str, String)>,
    client: Client,
}

impl HttpProbe {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            client: Client::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    /// Lists models, which needs a valid key but costs no quota.
    pub fn gemini(config: &AppConfig) -> Self {
        let url = format!("{}/v1beta/models", config.gemini_api_base_url.trim_end_matches('/'));
        Self::new(GEMINI_COMPONENT, &url).with_header("x-goog-api-key", &config.google_api_key)
    }

    pub fn backend(config: &AppConfig) -> Self {
        let url = format!("{}/health/live", config.mcp_server_url.trim_end_matches('/'));
        Self::new(BACKEND_COMPONENT, &url)
    }
}

#[async_trait]
impl DependencyProbe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<()> {
        let mut request = self.client.get(&self.url);
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            bail!("{} returned {}", self.url, response.status());
        }
        Ok(())
    }
}
