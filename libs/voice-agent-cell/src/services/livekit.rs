// libs/voice-agent-cell/src/services/livekit.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use livekit_api::access_token::TokenVerifier;
use livekit_api::services::room::RoomClient;
use livekit_api::webhooks::WebhookReceiver;
use livekit_protocol::WebhookEvent;

use monitoring_cell::DependencyProbe;
use shared_config::AppConfig;

use crate::models::{SessionDispatch, VoiceAgentError, CALL_ROOM_PREFIX};

pub const LIVEKIT_COMPONENT: &str = "livekit";

/// What a verified webhook asks the worker to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    Start(SessionDispatch),
    End { session_id: String },
    Ignore { event: String },
}

/// RoomService speaks HTTP; configs usually carry the signalling URL.
pub fn livekit_http_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        url.to_string()
    }
}

pub struct LiveKitWebhooks {
    receiver: WebhookReceiver,
}

impl LiveKitWebhooks {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            receiver: WebhookReceiver::new(TokenVerifier::with_api_key(
                &config.livekit_api_key,
                &config.livekit_api_secret,
            )),
        }
    }

    /// Check the signed `Authorization` token against the raw body.
    pub fn verify(&self, body: &str, authorization: Option<&str>) -> Result<WebhookEvent, VoiceAgentError> {
        let token = authorization
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| VoiceAgentError::InvalidWebhook("missing Authorization header".to_string()))?;

        self.receiver
            .receive(body, token)
            .map_err(|e| VoiceAgentError::InvalidWebhook(e.to_string()))
    }
}

/// Only `call-` rooms are phone calls; everything else is ignored.
pub fn action_for(event: &WebhookEvent) -> WebhookAction {
    let ignore = || WebhookAction::Ignore { event: event.event.clone() };

    let Some(room) = event.room.as_ref() else {
        return ignore();
    };
    if !room.name.starts_with(CALL_ROOM_PREFIX) {
        return ignore();
    }

    let session_id = if room.sid.is_empty() { room.name.clone() } else { room.sid.clone() };

    match event.event.as_str() {
        "room_started" => WebhookAction::Start(SessionDispatch {
            session_id,
            room_name: room.name.clone(),
        }),
        "room_finished" => WebhookAction::End { session_id },
        _ => ignore(),
    }
}

pub struct LiveKitProbe {
    client: RoomClient,
}

impl LiveKitProbe {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: RoomClient::with_api_key(
                &livekit_http_url(&config.livekit_url),
                &config.livekit_api_key,
                &config.livekit_api_secret,
            ),
        }
    }
}

#[async_trait]
impl DependencyProbe for LiveKitProbe {
    fn name(&self) -> &str {
        LIVEKIT_COMPONENT
    }

    async fn check(&self) -> Result<()> {
        self.client
            .list_rooms(Vec::new())
            .await
            .map(|_| ())
            .map_err(|e| anyhow!("LiveKit RoomService: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livekit_protocol::Room;

    fn event(kind: &str, name: &str, sid: &str) -> WebhookEvent {
        WebhookEvent {
            event: kind.to_string(),
            room: Some(Room { name: name.to_string(), sid: sid.to_string(), ..Default::default() }),
            ..Default::default()
        }
    }

    #[test]
    fn test_call_rooms_start_and_end_sessions() {
        assert_eq!(
            action_for(&event("room_started", "call-_+9198_x", "RM_1")),
            WebhookAction::Start(SessionDispatch {
                session_id: "RM_1".to_string(),
                room_name: "call-_+9198_x".to_string()
            })
        );
        assert_eq!(
            action_for(&event("room_finished", "call-_+9198_x", "RM_1")),
            WebhookAction::End { session_id: "RM_1".to_string() }
        );
    }

    #[test]
    fn test_room_name_used_when_sid_missing() {
        assert_eq!(
            action_for(&event("room_finished", "call-abc", "")),
            WebhookAction::End { session_id: "call-abc".to_string() }
        );
    }

    #[test]
    fn test_other_rooms_and_events_ignored() {
        assert_eq!(
            action_for(&event("room_started", "standup", "RM_2")),
            WebhookAction::Ignore { event: "room_started".to_string() }
        );
        assert_eq!(
            action_for(&event("participant_joined", "call-abc", "RM_3")),
            WebhookAction::Ignore { event: "participant_joined".to_string() }
        );
    }

    #[test]
    fn test_signalling_url_mapped_to_http() {
        assert_eq!(livekit_http_url("wss://clinic.livekit.cloud"), "https://clinic.livekit.cloud");
        assert_eq!(livekit_http_url("ws://localhost:7880"), "http://localhost:7880");
        assert_eq!(livekit_http_url("http://localhost:7880"), "http://localhost:7880");
    }
}
