pub mod health;
pub mod lifecycle;
pub mod livekit;
pub mod mcp_client;
pub mod outcome;
pub mod prompts;
pub mod session;
pub mod summary;
pub mod tools;

pub use health::worker_health_monitor;
pub use lifecycle::{Heartbeat, SessionManager};
pub use livekit::{LiveKitProbe, LiveKitWebhooks, WebhookAction};
pub use mcp_client::{McpClient, McpError};
