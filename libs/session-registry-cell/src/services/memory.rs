use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::lease_millis;
use crate::{ClaimOutcome, RegistryError, SessionRegistry};

struct Lease {
    owner: String,
    expires_at: Instant,
}

#[derive(Default)]
struct RegistryState {
    leases: HashMap<String, Lease>,
    close_requests: HashSet<String>,
}

impl RegistryState {
    fn live_owner(&mut self, session_id: &str) -> Option<&Lease> {
        let expired = self
            .leases
            .get(session_id)
            .is_some_and(|lease| lease.expires_at <= Instant::now());
        if expired {
            self.leases.remove(session_id);
        }
        self.leases.get(session_id)
    }
}

/// Registry for a single worker process. Leases expire the same way they do
/// in Redis, so lifecycle code behaves identically against both.
#[derive(Default)]
pub struct InMemorySessionRegistry {
    state: Mutex<RegistryState>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn claim(&self, session_id: &str, owner: &str, lease: Duration) -> Result<ClaimOutcome, RegistryError> {
        lease_millis(session_id, lease)?;
        let mut state = self.state.lock().await;

        if let Some(current) = state.live_owner(session_id) {
            if current.owner != owner {
                return Ok(ClaimOutcome::HeldBy(current.owner.clone()));
            }
        }

        state.leases.insert(
            session_id.to_string(),
            Lease { owner: owner.to_string(), expires_at: Instant::now() + lease },
        );
        Ok(ClaimOutcome::Acquired)
    }

    async fn renew(&self, session_id: &str, owner: &str, lease: Duration) -> Result<bool, RegistryError> {
        lease_millis(session_id, lease)?;
        let mut state = self.state.lock().await;

        let held = state.live_owner(session_id).is_some_and(|l| l.owner == owner);
        if held {
            if let Some(current) = state.leases.get_mut(session_id) {
                current.expires_at = Instant::now() + lease;
            }
        }
        Ok(held)
    }

    async fn release(&self, session_id: &str, owner: &str) -> Result<bool, RegistryError> {
        let mut state = self.state.lock().await;

        let held = state.live_owner(session_id).is_some_and(|l| l.owner == owner);
        if held {
            state.leases.remove(session_id);
            state.close_requests.remove(session_id);
        }
        Ok(held)
    }

    async fn owner(&self, session_id: &str) -> Result<Option<String>, RegistryError> {
        let mut state = self.state.lock().await;
        Ok(state.live_owner(session_id).map(|l| l.owner.clone()))
    }

    async fn request_close(&self, session_id: &str) -> Result<(), RegistryError> {
        self.state.lock().await.close_requests.insert(session_id.to_string());
        Ok(())
    }

    async fn close_requested(&self, session_id: &str) -> Result<bool, RegistryError> {
        Ok(self.state.lock().await.close_requests.contains(session_id))
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}
