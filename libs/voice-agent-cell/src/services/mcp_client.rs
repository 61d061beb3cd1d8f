// libs/voice-agent-cell/src/services/mcp_client.rs
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use call_history_cell::models::AddCallHistoryRequest;
use clinic_cell::models::Doctor;
use shared_config::AppConfig;
use shared_models::tool::ToolResponse;
use shared_utils::extractor::{CALL_ID_HEADER, USER_ID_HEADER};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 4xx: the backend refused the request as sent.
    #[error("Backend rejected {endpoint}: {message}")]
    Rejected { endpoint: String, status: u16, message: String },

    #[error("Backend error on {endpoint} ({status}): {message}")]
    Upstream { endpoint: String, status: u16, message: String },

    #[error("Unexpected backend response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

/// HTTP client for the appointment backend's tool endpoints.
#[derive(Clone)]
pub struct McpClient {
    client: Client,
    base_url: String,
}

impl McpClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.mcp_server_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a tool endpoint on behalf of a call.
    #[instrument(skip(self, body), fields(endpoint = %endpoint))]
    pub async fn call(
        &self,
        endpoint: &str,
        body: &Value,
        user_id: Option<&Uuid>,
        call_id: &str,
    ) -> Result<ToolResponse, McpError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut request = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header(CALL_ID_HEADER, call_id)
            .json(body);
        if let Some(user_id) = user_id {
            request = request.header(USER_ID_HEADER, user_id.to_string());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);

            return Err(if status.is_client_error() && status != StatusCode::REQUEST_TIMEOUT {
                McpError::Rejected { endpoint: endpoint.to_string(), status: status.as_u16(), message }
            } else {
                McpError::Upstream { endpoint: endpoint.to_string(), status: status.as_u16(), message }
            });
        }

        let tool_response: ToolResponse = response.json().await.map_err(|e| McpError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        debug!("{} -> {}", endpoint, tool_response.as_text());
        Ok(tool_response)
    }

    fn decode<T: DeserializeOwned>(endpoint: &str, response: ToolResponse) -> Result<T, McpError> {
        serde_json::from_value(response.result).map_err(|e| McpError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    /// `None` when no clinic, or more than one, answers on that number.
    pub async fn get_user_id_by_agent_phone(&self, agent_phone: &str, call_id: &str) -> Result<Option<Uuid>, McpError> {
        let endpoint = "get_user_id_by_agent_phone";
        let response = self.call(endpoint, &json!({ "agent_phone": agent_phone }), None, call_id).await?;
        Self::decode(endpoint, response)
    }

    pub async fn get_doctor_details(&self, user_id: &Uuid, call_id: &str) -> Result<Vec<Doctor>, McpError> {
        let endpoint = "get_doctor_details_for_user";
        let response = self.call(endpoint, &json!({}), Some(user_id), call_id).await?;
        Self::decode(endpoint, response)
    }

    pub async fn add_call_history(
        &self,
        user_id: &Uuid,
        call_id: &str,
        record: &AddCallHistoryRequest,
    ) -> Result<String, McpError> {
        let body = serde_json::to_value(record).map_err(|e| McpError::InvalidResponse {
            endpoint: "add_call_history".to_string(),
            message: e.to_string(),
        })?;
        let response = self.call("add_call_history", &body, Some(user_id), call_id).await?;
        Ok(response.as_text())
    }

    pub async fn summarize_call(&self, transcript: &str, call_id: &str) -> Result<String, McpError> {
        let response = self
            .call("summarize_call", &json!({ "transcript": transcript }), None, call_id)
            .await?;
        Ok(response.as_text())
    }
}
