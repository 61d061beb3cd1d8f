use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, instrument};

use shared_config::AppConfig;

use crate::models::{CallHistoryError, GenerateContentResponse};

const SUMMARY_INSTRUCTION: &str = "Summarize this clinic phone call in two or three sentences. \
Mention any appointment that was booked, moved or cancelled, with the doctor, date and time, \
and any clinic information the caller asked for.";

/// Summarises call transcripts with Gemini's `generateContent` REST API.
pub struct CallSummarizer {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl CallSummarizer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.gemini_api_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_summary_model.clone(),
            api_key: config.google_api_key.clone(),
        }
    }

    #[instrument(skip(self, transcript), fields(chars = transcript.len()))]
    pub async fn summarize(&self, transcript: &str) -> Result<String, CallHistoryError> {
        if transcript.trim().is_empty() {
            return Err(CallHistoryError::Invalid("transcript must not be empty".to_string()));
        }

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": format!("{}\n\n{}", SUMMARY_INSTRUCTION, transcript) }]
            }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .map_err(|e| CallHistoryError::Summarizer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Gemini returned {}: {}", status, text);
            return Err(CallHistoryError::Summarizer(format!("Gemini returned {}", status)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CallHistoryError::Summarizer(format!("unreadable Gemini response: {}", e)))?;

        let summary = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string();

        if summary.is_empty() {
            return Err(CallHistoryError::Summarizer("Gemini returned no text".to_string()));
        }

        debug!("Summary produced ({} chars)", summary.len());
        Ok(summary)
    }
}
