use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

/// PostgreSQL `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Conflict: {message}")]
    Conflict {
        code: Option<String>,
        message: String,
        details: Option<String>,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::Conflict { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }

    /// True when the conflict's message or details mention `needle`,
    /// typically a column or constraint name.
    pub fn conflict_mentions(&self, needle: &str) -> bool {
        match self {
            DatabaseError::Conflict { message, details, .. } => {
                message.contains(needle)
                    || details.as_deref().map(|d| d.contains(needle)).unwrap_or(false)
            }
            _ => false,
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict { message, .. } => AppError::Conflict(message),
            DatabaseError::NotFound(msg) => AppError::NotFound(msg),
            DatabaseError::Auth(msg) => AppError::Database(format!("Database rejected credentials: {}", msg)),
            DatabaseError::Transport(e) => AppError::Unavailable(format!("Database unreachable: {}", e)),
            other => AppError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_credentials(&config.supabase_url, &config.supabase_key)
    }

    pub fn with_credentials(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn get_headers(&self, method: &Method) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| DatabaseError::InvalidRequest("API key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| DatabaseError::InvalidRequest("API key is not a valid header value".to_string()))?;

        headers.insert(HeaderName::from_static("apikey"), key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if *method == Method::POST || *method == Method::PATCH {
            headers.insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static("return=representation"),
            );
        }

        Ok(headers)
    }

    /// Issue a PostgREST request and decode the JSON body.
    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(&method)?;
        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(Self::map_error(status, error_text));
        }

        let text = response.text().await?;
        // PATCH/DELETE without representation return an empty body.
        let text = if text.trim().is_empty() { "[]".to_string() } else { text };

        serde_json::from_str::<T>(&text).map_err(|e| DatabaseError::Decode(e.to_string()))
    }

    fn map_error(status: StatusCode, error_text: String) -> DatabaseError {
        let parsed = serde_json::from_str::<PostgrestError>(&error_text).ok();

        match status.as_u16() {
            409 => {
                let (code, message, details) = match parsed {
                    Some(body) => (
                        body.code,
                        body.message.unwrap_or_else(|| error_text.clone()),
                        body.details,
                    ),
                    None => (None, error_text, None),
                };
                warn!("Conflict from database: {} ({:?})", message, code);
                DatabaseError::Conflict { code, message, details }
            }
            401 | 403 => {
                error!("API error ({}): {}", status, error_text);
                DatabaseError::Auth(error_text)
            }
            404 => DatabaseError::NotFound(error_text),
            _ => {
                error!("API error ({}): {}", status, error_text);
                DatabaseError::Api {
                    status: status.as_u16(),
                    message: error_text,
                }
            }
        }
    }

    /// Reachability probe against the REST root.
    pub async fn ping(&self, timeout: Duration) -> Result<(), DatabaseError> {
        let url = format!("{}/rest/v1/", self.base_url);
        let headers = self.get_headers(&Method::GET)?;

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(Self::map_error(status, error_text))
        }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
