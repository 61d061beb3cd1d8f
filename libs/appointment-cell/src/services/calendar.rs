// libs/appointment-cell/src/services/calendar.rs
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use clinic_cell::models::UserSettings;
use shared_config::AppConfig;
use shared_utils::time::{calendar_datetime, CLINIC_TIMEZONE};

use crate::models::Appointment;

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EVENT_HOURS: i64 = 1;

/// The parts of a Google service-account key we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

/// Mirrors appointments into the doctor's Google Calendar. Callers treat
/// every failure here as non-fatal.
pub struct CalendarSync {
    client: Client,
    base_url: String,
}

impl CalendarSync {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.google_calendar_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn credentials(settings: &UserSettings) -> Result<Option<ServiceAccountKey>> {
        match settings.calendar_auth.as_ref() {
            None => Ok(None),
            Some(value) if value.is_null() => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .context("calendar_auth is not a service-account key"),
        }
    }

    fn calendar_id<'s>(settings: &'s UserSettings, appointment: &Appointment) -> Option<&'s str> {
        settings
            .find_doctor(&appointment.assigned_doctor)
            .and_then(|doctor| doctor.calendar_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    async fn access_token(&self, key: &ServiceAccountKey) -> Result<String> {
        let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: CALENDAR_SCOPE,
            aud: token_uri,
            iat: now,
            exp: now + 3600,
        };

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("service-account private key is not RSA PEM")?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?;

        let form = format!(
            "grant_type={}&assertion={}",
            urlencoding::encode("urn:ietf:params:oauth:grant-type:jwt-bearer"),
            urlencoding::encode(&assertion)
        );
        let response = self
            .client
            .post(token_uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .timeout(Duration::from_secs(10))
            .body(form)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("token exchange returned {}", response.status());
        }

        Ok(response.json::<TokenResponse>().await?.access_token)
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(calendar_id))
    }

    /// Create the event and return its id, or `None` when the clinic has no
    /// calendar configured for the doctor.
    pub async fn add_event(&self, settings: &UserSettings, appointment: &Appointment) -> Result<Option<String>> {
        let Some(key) = Self::credentials(settings)? else {
            debug!("No calendar credentials for clinic {}", settings.user_id);
            return Ok(None);
        };
        let Some(calendar_id) = Self::calendar_id(settings, appointment) else {
            debug!("No calendar configured for {}", appointment.assigned_doctor);
            return Ok(None);
        };

        let start = appointment.appointment_date.and_time(appointment.appointment_time);
        let end = start + ChronoDuration::hours(EVENT_HOURS);
        let event = json!({
            "summary": format!("Appointment with {}", appointment.patient_name),
            "description": appointment.appointment_reason,
            "start": {
                "dateTime": calendar_datetime(start.date(), start.time()),
                "timeZone": CLINIC_TIMEZONE,
            },
            "end": {
                "dateTime": calendar_datetime(end.date(), end.time()),
                "timeZone": CLINIC_TIMEZONE,
            },
        });

        let token = self.access_token(&key).await?;
        let response = self
            .client
            .post(self.events_url(calendar_id))
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
            .json(&event)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("event insert returned {}", response.status());
        }

        let created: CreatedEvent = response.json().await?;
        info!("Calendar event {} created for {}", created.id, appointment.assigned_doctor);
        Ok(Some(created.id))
    }

    pub async fn remove_event(&self, settings: &UserSettings, appointment: &Appointment) -> Result<()> {
        let Some(event_id) = appointment.event_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(());
        };
        let Some(key) = Self::credentials(settings)? else {
            return Ok(());
        };
        let calendar_id = Self::calendar_id(settings, appointment)
            .ok_or_else(|| anyhow!("no calendar configured for {}", appointment.assigned_doctor))?;

        let token = self.access_token(&key).await?;
        let url = format!("{}/{}", self.events_url(calendar_id), urlencoding::encode(event_id));
        let response = self
            .client
            .delete(url)
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        // 410 Gone: already deleted on the calendar side.
        if !response.status().is_success() && response.status().as_u16() != 410 {
            bail!("event delete returned {}", response.status());
        }

        info!("Calendar event {} removed", event_id);
        Ok(())
    }
}
