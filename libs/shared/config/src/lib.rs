use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

pub const DEFAULT_MCP_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_MCP_SERVER_PORT: u16 = 8000;
pub const DEFAULT_WORKER_HEALTH_PORT: u16 = 8081;
pub const DEFAULT_SESSION_LEASE_SECONDS: u64 = 30;
pub const MIN_SESSION_LEASE_SECONDS: u64 = 5;
pub const DEFAULT_HEALTH_PROBE_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_SUMMARY_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// The process a configuration is loaded for. Each role validates its own
/// subset of the recognised environment keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRole {
    McpServer,
    VoiceWorker,
}

impl ServiceRole {
    pub fn service_name(&self) -> &'static str {
        match self {
            ServiceRole::McpServer => "mcp-server",
            ServiceRole::VoiceWorker => "voice-worker",
        }
    }

    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            ServiceRole::McpServer => &["SUPABASE_URL", "SUPABASE_KEY", "GOOGLE_API_KEY"],
            ServiceRole::VoiceWorker => &[
                "LIVEKIT_URL",
                "LIVEKIT_API_KEY",
                "LIVEKIT_API_SECRET",
                "GOOGLE_API_KEY",
            ],
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {key} for {role}")]
    Missing { key: &'static str, role: ServiceRole },

    #[error("environment variable {key} is malformed: {reason}")]
    Malformed { key: &'static str, reason: String },
}

impl ConfigError {
    /// Name of the offending environment variable.
    pub fn key(&self) -> &'static str {
        match self {
            ConfigError::Missing { key, .. } => key,
            ConfigError::Malformed { key, .. } => key,
        }
    }
}

/// Clinic metadata spoken by the voice agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicProfile {
    pub name: String,
    pub address: String,
    pub timings: String,
    pub phone: String,
    pub services: String,
    /// Number callers dial; used when the provider does not report it.
    pub called_number: String,
}

impl Default for ClinicProfile {
    fn default() -> Self {
        Self {
            name: "Syraa Multispeciality Clinic".to_string(),
            address: "123 MG Road, Bengaluru, Karnataka 560001".to_string(),
            timings: "Monday to Saturday, 9:00 AM to 7:00 PM; Sunday closed".to_string(),
            phone: "+91-98765-43210".to_string(),
            services: "General Medicine, Pediatrics, Endocrinology, Cardiology, Diagnostics, Vaccinations, Health Checkups".to_string(),
            called_number: "+912269539733".to_string(),
        }
    }
}

/// Optional speech, model and telephony vendor credentials.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub deepgram_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub plivo_auth_id: Option<String>,
    pub plivo_auth_token: Option<String>,
}

impl ProviderCredentials {
    pub fn configured(&self) -> Vec<&'static str> {
        let mut providers = Vec::new();
        if self.deepgram_api_key.is_some() {
            providers.push("deepgram");
        }
        if self.elevenlabs_api_key.is_some() {
            providers.push("elevenlabs");
        }
        if self.openai_api_key.is_some() {
            providers.push("openai");
        }
        if self.plivo_auth_id.is_some() && self.plivo_auth_token.is_some() {
            providers.push("plivo");
        }
        providers
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub role: ServiceRole,
    pub supabase_url: String,
    pub supabase_key: String,
    pub google_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_summary_model: String,
    pub google_calendar_base_url: String,
    pub mcp_server_url: String,
    pub listen_port: u16,
    pub livekit_url: String,
    pub livekit_api_key: String,
    pub livekit_api_secret: String,
    pub redis_url: Option<String>,
    pub worker_id: String,
    pub session_lease_seconds: u64,
    pub health_probe_timeout_ms: u64,
    pub clinic: ClinicProfile,
    pub providers: ProviderCredentials,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("role", &self.role)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"[REDACTED]")
            .field("google_api_key", &"[REDACTED]")
            .field("gemini_api_base_url", &self.gemini_api_base_url)
            .field("gemini_summary_model", &self.gemini_summary_model)
            .field("google_calendar_base_url", &self.google_calendar_base_url)
            .field("mcp_server_url", &self.mcp_server_url)
            .field("listen_port", &self.listen_port)
            .field("livekit_url", &self.livekit_url)
            .field("livekit_api_key", &self.livekit_api_key)
            .field("livekit_api_secret", &"[REDACTED]")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("worker_id", &self.worker_id)
            .field("session_lease_seconds", &self.session_lease_seconds)
            .field("health_probe_timeout_ms", &self.health_probe_timeout_ms)
            .field("clinic", &self.clinic)
            .field("providers", &self.providers.configured())
            .finish()
    }
}

impl AppConfig {
    /// Load and validate the configuration for `role` from the process
    /// environment.
    pub fn from_env(role: ServiceRole) -> Result<Self, ConfigError> {
        Self::from_lookup(role, |key| env::var(key).ok())
    }

    /// Load and validate the configuration for `role` from an arbitrary key
    /// lookup. Stops at the first missing or malformed value.
    pub fn from_lookup<F>(role: ServiceRole, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = EnvLookup { role, lookup };

        for key in role.required_keys() {
            vars.required(key)?;
        }

        let is_backend = role == ServiceRole::McpServer;
        let is_worker = role == ServiceRole::VoiceWorker;

        let supabase_url = if is_backend {
            vars.required_url("SUPABASE_URL", &["http", "https"])?
        } else {
            String::new()
        };
        let supabase_key = if is_backend { vars.required("SUPABASE_KEY")? } else { String::new() };

        let (livekit_url, livekit_api_key, livekit_api_secret) = if is_worker {
            (
                vars.required_url("LIVEKIT_URL", &["ws", "wss", "http", "https"])?,
                vars.required("LIVEKIT_API_KEY")?,
                vars.required("LIVEKIT_API_SECRET")?,
            )
        } else {
            (String::new(), String::new(), String::new())
        };

        let mcp_server_url = vars
            .optional_url("MCP_SERVER_URL", &["http", "https"])?
            .unwrap_or_else(|| DEFAULT_MCP_SERVER_URL.to_string());

        let listen_port = if is_backend {
            vars.parsed("MCP_SERVER_PORT", DEFAULT_MCP_SERVER_PORT)?
        } else {
            vars.parsed("WORKER_HEALTH_PORT", DEFAULT_WORKER_HEALTH_PORT)?
        };

        let redis_url = if is_worker {
            vars.optional_url("REDIS_URL", &["redis", "rediss"])?
        } else {
            None
        };

        let session_lease_seconds: u64 =
            vars.parsed("SESSION_LEASE_SECONDS", DEFAULT_SESSION_LEASE_SECONDS)?;
        if session_lease_seconds < MIN_SESSION_LEASE_SECONDS {
            return Err(ConfigError::Malformed {
                key: "SESSION_LEASE_SECONDS",
                reason: format!("must be at least {} seconds", MIN_SESSION_LEASE_SECONDS),
            });
        }

        let health_probe_timeout_ms: u64 =
            vars.parsed("HEALTH_PROBE_TIMEOUT_MS", DEFAULT_HEALTH_PROBE_TIMEOUT_MS)?;
        if health_probe_timeout_ms == 0 {
            return Err(ConfigError::Malformed {
                key: "HEALTH_PROBE_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let worker_id = vars
            .optional("WORKER_ID")
            .or_else(|| vars.optional("HOSTNAME"))
            .unwrap_or_else(|| format!("worker-{}", &Uuid::new_v4().simple().to_string()[..8]));

        let defaults = ClinicProfile::default();
        let clinic = ClinicProfile {
            name: vars.optional("CLINIC_NAME").unwrap_or(defaults.name),
            address: vars.optional("CLINIC_ADDRESS").unwrap_or(defaults.address),
            timings: vars.optional("CLINIC_TIMINGS").unwrap_or(defaults.timings),
            phone: vars.optional("CLINIC_PHONE").unwrap_or(defaults.phone),
            services: vars.optional("CLINIC_SERVICES").unwrap_or(defaults.services),
            called_number: vars.optional("CLINIC_PHONE_NUMBER").unwrap_or(defaults.called_number),
        };

        let providers = ProviderCredentials {
            deepgram_api_key: vars.optional("DEEPGRAM_API_KEY"),
            elevenlabs_api_key: vars.optional("ELEVENLABS_API_KEY"),
            openai_api_key: vars.optional("OPENAI_API_KEY"),
            plivo_auth_id: vars.optional("PLIVO_AUTH_ID"),
            plivo_auth_token: vars.optional("PLIVO_AUTH_TOKEN"),
        };
        match (&providers.plivo_auth_id, &providers.plivo_auth_token) {
            (Some(_), None) => {
                return Err(ConfigError::Malformed {
                    key: "PLIVO_AUTH_TOKEN",
                    reason: "required when PLIVO_AUTH_ID is set".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Malformed {
                    key: "PLIVO_AUTH_ID",
                    reason: "required when PLIVO_AUTH_TOKEN is set".to_string(),
                })
            }
            _ => {}
        }

        let config = Self {
            role,
            supabase_url,
            supabase_key,
            google_api_key: vars.required("GOOGLE_API_KEY")?,
            gemini_api_base_url: vars
                .optional_url("GEMINI_API_BASE_URL", &["http", "https"])?
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE_URL.to_string()),
            gemini_summary_model: vars
                .optional("GEMINI_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_SUMMARY_MODEL.to_string()),
            google_calendar_base_url: vars
                .optional_url("GOOGLE_CALENDAR_BASE_URL", &["http", "https"])?
                .unwrap_or_else(|| DEFAULT_GOOGLE_CALENDAR_BASE_URL.to_string()),
            mcp_server_url,
            listen_port,
            livekit_url,
            livekit_api_key,
            livekit_api_secret,
            redis_url,
            worker_id,
            session_lease_seconds,
            health_probe_timeout_ms,
            clinic,
            providers,
        };

        if is_worker && config.redis_url.is_none() {
            warn!("REDIS_URL not set - session ownership is tracked in-process and the worker must not be scaled beyond one instance");
        }
        info!(
            "Configuration validated for {} (optional providers: {:?})",
            role,
            config.providers.configured()
        );

        Ok(config)
    }
}

struct EnvLookup<F> {
    role: ServiceRole,
    lookup: F,
}

impl<F> EnvLookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing { key, role: self.role })
    }

    fn required_url(&self, key: &'static str, schemes: &[&str]) -> Result<String, ConfigError> {
        let value = self.required(key)?;
        validate_url(key, &value, schemes)?;
        Ok(value.trim_end_matches('/').to_string())
    }

    fn optional_url(&self, key: &'static str, schemes: &[&str]) -> Result<Option<String>, ConfigError> {
        match self.optional(key) {
            Some(value) => {
                validate_url(key, &value, schemes)?;
                Ok(Some(value.trim_end_matches('/').to_string()))
            }
            None => Ok(None),
        }
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key) {
            Some(value) => value.parse::<T>().map_err(|e| ConfigError::Malformed {
                key,
                reason: format!("'{}' ({})", value, e),
            }),
            None => Ok(default),
        }
    }
}

fn validate_url(key: &'static str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let parsed = Url::parse(value).map_err(|e| ConfigError::Malformed {
        key,
        reason: format!("'{}' is not a valid URL ({})", value, e),
    })?;

    if !schemes.contains(&parsed.scheme()) {
        return Err(ConfigError::Malformed {
            key,
            reason: format!("scheme '{}' not one of {:?}", parsed.scheme(), schemes),
        });
    }

    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(ConfigError::Malformed {
            key,
            reason: format!("'{}' has no host", value),
        });
    }

    Ok(())
}
