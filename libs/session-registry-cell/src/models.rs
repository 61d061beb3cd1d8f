use std::time::Duration;

use async_trait::async_trait;

use crate::RegistryError;

/// Result of trying to take ownership of a voice session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller now owns the session (or already did; the lease was extended).
    Acquired,
    /// Another worker holds a live lease.
    HeldBy(String),
}

impl ClaimOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, ClaimOutcome::Acquired)
    }
}

/// Cluster-wide record of which worker owns which voice session.
///
/// Ownership is an expiring lease: an owner that stops renewing loses the
/// session once the lease runs out, and at most one owner holds a live lease
/// for a session id at any instant.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn claim(&self, session_id: &str, owner: &str, lease: Duration) -> Result<ClaimOutcome, RegistryError>;

    /// Extends the lease only if `owner` still holds it.
    async fn renew(&self, session_id: &str, owner: &str, lease: Duration) -> Result<bool, RegistryError>;

    /// Drops the lease and any pending close request if `owner` holds it.
    async fn release(&self, session_id: &str, owner: &str) -> Result<bool, RegistryError>;

    async fn owner(&self, session_id: &str) -> Result<Option<String>, RegistryError>;

    /// Asks whichever worker owns the session to end it.
    async fn request_close(&self, session_id: &str) -> Result<(), RegistryError>;

    async fn close_requested(&self, session_id: &str) -> Result<bool, RegistryError>;

    async fn ping(&self) -> Result<(), RegistryError>;
}

pub(crate) fn lease_millis(session_id: &str, lease: Duration) -> Result<u64, RegistryError> {
    let millis = lease.as_millis() as u64;
    if millis == 0 {
        return Err(RegistryError::InvalidLease {
            session_id: session_id.to_string(),
            reason: "lease must be positive".to_string(),
        });
    }
    Ok(millis)
}
