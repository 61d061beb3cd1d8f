use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AddCallHistoryRequest, CallHistoryError, CallHistoryOutcome, CallHistoryRow};

pub struct CallHistoryService {
    supabase: Arc<SupabaseClient>,
}

impl CallHistoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Store the record for a finished call. A second record for the same
    /// call is reported, not duplicated.
    #[instrument(skip(self, request), fields(appointment_status = %request.appointment_status))]
    pub async fn add_call_history(
        &self,
        user_id: &Uuid,
        call_id: &str,
        request: AddCallHistoryRequest,
    ) -> Result<CallHistoryOutcome, CallHistoryError> {
        if request.called_number.trim().is_empty() {
            return Err(CallHistoryError::Invalid("called_number must not be empty".to_string()));
        }

        let row = json!({
            "caller_number": request.caller_number,
            "called_number": request.called_number,
            "call_start": request.call_start,
            "call_end": request.call_end,
            "call_duration": request.call_duration,
            "call_status": request.call_status,
            "appointment_status": request.appointment_status,
            "call_summary": request.call_summary,
            "call_id": call_id,
            "user_id": user_id,
        });

        let inserted: Vec<CallHistoryRow> = match self
            .supabase
            .request(Method::POST, "/rest/v1/call_history", Some(row))
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_unique_violation() => {
                info!("Call history for {} already stored", call_id);
                return Ok(CallHistoryOutcome::AlreadyExists);
            }
            Err(e) => return Err(e.into()),
        };

        if inserted.is_empty() {
            return Err(CallHistoryError::NotPersisted(
                "database insert returned no data".to_string(),
            ));
        }

        info!("Call history stored for {}", call_id);
        Ok(CallHistoryOutcome::Added)
    }

    /// Best-effort update of the appointment status on an existing call
    /// record. Returns whether a row was touched.
    pub async fn update_appointment_status(&self, call_id: &str, status: &str) -> Result<bool, CallHistoryError> {
        let path = format!("/rest/v1/call_history?call_id=eq.{}", urlencoding::encode(call_id));
        let updated: Vec<CallHistoryRow> = self
            .supabase
            .request(Method::PATCH, &path, Some(json!({ "appointment_status": status })))
            .await?;

        if updated.is_empty() {
            debug!("No call history row yet for {}; status '{}' not recorded", call_id, status);
            return Ok(false);
        }

        Ok(true)
    }

    /// Same as [`update_appointment_status`](Self::update_appointment_status)
    /// but never fails the caller.
    pub async fn mark_appointment_status(&self, call_id: &str, status: &str) {
        if let Err(e) = self.update_appointment_status(call_id, status).await {
            warn!("Could not update call history status for {}: {}", call_id, e);
        }
    }
}
