use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicError, ClinicProfileRow, Doctor, UserIdRow, UserSettings};

/// Read access to the clinic's configuration rows.
pub struct ClinicSettingsService {
    supabase: Arc<SupabaseClient>,
}

impl ClinicSettingsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    #[instrument(skip(self))]
    pub async fn get_user_settings(&self, user_id: &Uuid) -> Result<Option<UserSettings>, ClinicError> {
        let path = format!("/rest/v1/user_settings?user_id=eq.{}&select=*", user_id);
        let rows: Vec<UserSettings> = self.supabase.request(Method::GET, &path, None).await?;

        if rows.len() > 1 {
            warn!("Multiple user settings rows for {}, using the first", user_id);
        }

        let settings = rows.into_iter().next();
        debug!("User settings found for {}: {}", user_id, settings.is_some());
        Ok(settings)
    }

    pub async fn require_user_settings(&self, user_id: &Uuid) -> Result<UserSettings, ClinicError> {
        self.get_user_settings(user_id)
            .await?
            .ok_or_else(|| ClinicError::SettingsNotFound(user_id.to_string()))
    }

    /// Doctors configured for the clinic; an unknown clinic has none.
    pub async fn get_doctor_details(&self, user_id: &Uuid) -> Result<Vec<Doctor>, ClinicError> {
        Ok(self
            .get_user_settings(user_id)
            .await?
            .map(|s| s.doctor_details)
            .unwrap_or_default())
    }

    /// Resolve the clinic owner from the number a caller dialled.
    /// Ambiguous numbers resolve to nobody.
    #[instrument(skip(self))]
    pub async fn get_user_id_by_agent_phone(&self, agent_phone: &str) -> Result<Option<Uuid>, ClinicError> {
        let path = format!(
            "/rest/v1/user_settings?agent_phone=eq.{}&select=user_id&limit=2",
            urlencoding::encode(agent_phone.trim())
        );
        let rows: Vec<UserIdRow> = self.supabase.request(Method::GET, &path, None).await?;

        if rows.len() > 1 {
            warn!("Agent phone {} is configured for more than one clinic", agent_phone);
            return Ok(None);
        }

        let Some(raw) = rows.into_iter().next().and_then(|r| r.user_id) else {
            debug!("No clinic configured for agent phone {}", agent_phone);
            return Ok(None);
        };

        Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|_| ClinicError::InvalidData(format!("user_settings.user_id '{}' is not a UUID", raw)))
    }

    /// First three letters of the clinic's profile name, upper-cased, used to
    /// prefix appointment ids.
    #[instrument(skip(self))]
    pub async fn get_clinic_prefix(&self, user_id: &Uuid) -> Result<Option<String>, ClinicError> {
        let path = format!("/rest/v1/profiles?id=eq.{}&select=name", user_id);
        let rows: Vec<ClinicProfileRow> = self.supabase.request(Method::GET, &path, None).await?;

        let prefix = rows
            .into_iter()
            .next()
            .and_then(|row| row.name)
            .map(|name| name.trim().to_string())
            .filter(|name| name.chars().count() >= 3)
            .map(|name| name.chars().take(3).collect::<String>().to_uppercase());

        if prefix.is_none() {
            warn!("No usable clinic name in profile for {}", user_id);
        }

        Ok(prefix)
    }
}
