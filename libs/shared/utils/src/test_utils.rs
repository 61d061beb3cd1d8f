use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, ServiceRole};

pub const TEST_AGENT_PHONE: &str = "+912269539733";
pub const TEST_CLINIC_NAME: &str = "Smile Care Clinic";
pub const TEST_DOCTOR: &str = "Dr. Asha Rao";
pub const TEST_CARDIOLOGIST: &str = "Dr. Vikram Shah";

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_key: String,
    pub google_api_key: String,
    pub gemini_api_base_url: String,
    pub google_calendar_base_url: String,
    pub mcp_server_url: String,
    pub livekit_url: String,
    pub livekit_api_key: String,
    pub livekit_api_secret: String,
    pub worker_id: String,
    pub session_lease_seconds: u64,
    pub health_probe_timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_key: "test-service-key".to_string(),
            google_api_key: "test-google-key".to_string(),
            gemini_api_base_url: "http://localhost:54322".to_string(),
            google_calendar_base_url: "http://localhost:54323".to_string(),
            mcp_server_url: "http://localhost:8000".to_string(),
            livekit_url: "http://localhost:7880".to_string(),
            livekit_api_key: "devkey".to_string(),
            livekit_api_secret: "devsecret-devsecret-devsecret-devsecret".to_string(),
            worker_id: "worker-test".to_string(),
            session_lease_seconds: 30,
            health_probe_timeout_ms: 1000,
        }
    }
}

impl TestConfig {
    /// Point every external dependency of the role at one mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            gemini_api_base_url: uri.to_string(),
            google_calendar_base_url: uri.to_string(),
            mcp_server_url: uri.to_string(),
            livekit_url: uri.to_string(),
            ..Self::default()
        }
    }

    fn vars(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("SUPABASE_URL", self.supabase_url.clone()),
            ("SUPABASE_KEY", self.supabase_key.clone()),
            ("GOOGLE_API_KEY", self.google_api_key.clone()),
            ("GEMINI_API_BASE_URL", self.gemini_api_base_url.clone()),
            ("GOOGLE_CALENDAR_BASE_URL", self.google_calendar_base_url.clone()),
            ("MCP_SERVER_URL", self.mcp_server_url.clone()),
            ("LIVEKIT_URL", self.livekit_url.clone()),
            ("LIVEKIT_API_KEY", self.livekit_api_key.clone()),
            ("LIVEKIT_API_SECRET", self.livekit_api_secret.clone()),
            ("WORKER_ID", self.worker_id.clone()),
            ("SESSION_LEASE_SECONDS", self.session_lease_seconds.to_string()),
            ("HEALTH_PROBE_TIMEOUT_MS", self.health_probe_timeout_ms.to_string()),
            ("CLINIC_PHONE_NUMBER", TEST_AGENT_PHONE.to_string()),
        ])
    }

    pub fn to_app_config(&self, role: ServiceRole) -> AppConfig {
        let vars = self.vars();
        AppConfig::from_lookup(role, |key| vars.get(key).cloned())
            .expect("test configuration should validate")
    }

    pub fn backend(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config(ServiceRole::McpServer))
    }

    pub fn worker(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config(ServiceRole::VoiceWorker))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor(name: &str, specialty: &str, working_hours: &str) -> Value {
        json!({
            "name": name,
            "specialty": specialty,
            "services": ["Consultation"],
            "calendarId": format!("{}@group.calendar.google.com", name.to_lowercase().replace([' ', '.'], "")),
            "working_hours": working_hours
        })
    }

    pub fn user_settings_response(user_id: &str) -> Value {
        json!({
            "user_id": user_id,
            "doctor_details": [
                Self::doctor(TEST_DOCTOR, "General Medicine", "Monday-Saturday: 9:00 AM - 6:00 PM"),
                Self::doctor(TEST_CARDIOLOGIST, "Cardiology", "Monday-Wednesday-Friday: 11:00 AM - 7:00 PM")
            ],
            "calendar_auth": null,
            "agent_phone": TEST_AGENT_PHONE,
            "working_hours": "Monday-Saturday: 9:00 AM - 7:00 PM",
            "lunch_hours": "Monday-Saturday: 1:00 PM - 2:00 PM"
        })
    }

    pub fn profile_response(name: &str) -> Value {
        json!({ "name": name })
    }

    pub fn appointment_response(
        appointment_id: &str,
        user_id: &str,
        doctor: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "appointment_id": appointment_id,
            "patient_name": "Ravi Kumar",
            "appointment_reason": "Fever",
            "appointment_date": date,
            "appointment_time": time,
            "assigned_doctor": doctor,
            "event_id": null,
            "user_id": user_id,
            "call_id": format!("call-{}", Uuid::new_v4().simple()),
            "current_status": status
        })
    }

    pub fn call_history_response(call_id: &str, user_id: &str) -> Value {
        json!({
            "row_id": 1,
            "caller_number": "+919876543210",
            "called_number": TEST_AGENT_PHONE,
            "call_start": "2024-01-01T10:00:00+05:30",
            "call_end": "2024-01-01T10:03:00+05:30",
            "call_duration": "180",
            "call_status": "completed",
            "appointment_status": "Not Booked",
            "call_summary": "Patient called the clinic.",
            "call_id": call_id,
            "user_id": user_id
        })
    }

    /// PostgREST body for a violated unique constraint.
    pub fn unique_violation(constraint: &str, details: &str) -> Value {
        json!({
            "code": "23505",
            "message": format!("duplicate key value violates unique constraint \"{}\"", constraint),
            "details": details,
            "hint": null
        })
    }

    pub fn gemini_response(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": text }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();

        let backend = config.backend();
        assert_eq!(backend.supabase_url, "http://localhost:54321");
        assert_eq!(backend.supabase_key, "test-service-key");

        let worker = config.worker();
        assert_eq!(worker.worker_id, "worker-test");
        assert_eq!(worker.clinic.called_number, TEST_AGENT_PHONE);
    }

    #[test]
    fn test_mock_server_config_points_everything_at_one_uri() {
        let config = TestConfig::with_mock_server("http://127.0.0.1:4010").backend();
        assert_eq!(config.supabase_url, "http://127.0.0.1:4010");
        assert_eq!(config.gemini_api_base_url, "http://127.0.0.1:4010");
    }

    #[test]
    fn test_user_settings_fixture_shape() {
        let settings = MockSupabaseResponses::user_settings_response("u1");
        assert_eq!(settings["doctor_details"].as_array().unwrap().len(), 2);
        assert!(settings["doctor_details"][0]["calendarId"].as_str().unwrap().ends_with("calendar.google.com"));
    }
}
