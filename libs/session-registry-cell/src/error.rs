use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    PoolError(String),

    #[error("Invalid lease for session {session_id}: {reason}")]
    InvalidLease { session_id: String, reason: String },

    #[error("Claim on session {0} kept racing an expiring lease")]
    ClaimContended(String),
}
