use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use crate::models::lease_millis;
use crate::{ClaimOutcome, RegistryError, SessionRegistry};

const KEY_PREFIX: &str = "voice_session";
const CLOSE_REQUEST_TTL_MS: u64 = 10 * 60 * 1000;
const CLAIM_ATTEMPTS: usize = 3;

const RENEW_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('DEL', KEYS[2])
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

pub struct RedisSessionRegistry {
    pool: Pool,
    renew_script: Script,
    release_script: Script,
}

fn owner_key(session_id: &str) -> String {
    format!("{}:{}:owner", KEY_PREFIX, session_id)
}

fn close_key(session_id: &str) -> String {
    format!("{}:{}:close", KEY_PREFIX, session_id)
}

/// Outcome of a claim whose `SET NX` lost. `None` means the holder's key
/// expired before it could be read and the claim should be retried.
fn settle_claim(renewed: bool, holder: Option<String>) -> Option<ClaimOutcome> {
    if renewed {
        return Some(ClaimOutcome::Acquired);
    }
    holder.map(ClaimOutcome::HeldBy)
}

impl RedisSessionRegistry {
    pub async fn connect(redis_url: &str) -> Result<Self, RegistryError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RegistryError::PoolError(format!("Pool creation error: {}", e)))?;

        let registry = Self {
            pool,
            renew_script: Script::new(RENEW_SCRIPT),
            release_script: Script::new(RELEASE_SCRIPT),
        };

        registry.ping().await?;
        info!("Redis session registry initialized successfully");

        Ok(registry)
    }

    async fn get_connection(&self) -> Result<Connection, RegistryError> {
        self.pool
            .get()
            .await
            .map_err(|e| RegistryError::PoolError(e.to_string()))
    }

    async fn renew_with(&self, conn: &mut Connection, session_id: &str, owner: &str, millis: u64) -> Result<bool, RegistryError> {
        let renewed: i64 = self
            .renew_script
            .key(owner_key(session_id))
            .arg(owner)
            .arg(millis)
            .invoke_async(conn)
            .await?;
        Ok(renewed == 1)
    }
}

#[async_trait]
impl SessionRegistry for RedisSessionRegistry {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn claim(&self, session_id: &str, owner: &str, lease: Duration) -> Result<ClaimOutcome, RegistryError> {
        let millis = lease_millis(session_id, lease)?;
        let mut conn = self.get_connection().await?;
        let key = owner_key(session_id);

        for _ in 0..CLAIM_ATTEMPTS {
            let set: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(owner)
                .arg("NX")
                .arg("PX")
                .arg(millis)
                .query_async(&mut conn)
                .await?;

            if set.is_some() {
                debug!("{} claimed session {}", owner, session_id);
                return Ok(ClaimOutcome::Acquired);
            }

            let renewed = self.renew_with(&mut conn, session_id, owner, millis).await?;
            let holder: Option<String> = if renewed { None } else { conn.get(&key).await? };
            if let Some(outcome) = settle_claim(renewed, holder) {
                return Ok(outcome);
            }
        }

        Err(RegistryError::ClaimContended(session_id.to_string()))
    }

    async fn renew(&self, session_id: &str, owner: &str, lease: Duration) -> Result<bool, RegistryError> {
        let millis = lease_millis(session_id, lease)?;
        let mut conn = self.get_connection().await?;
        self.renew_with(&mut conn, session_id, owner, millis).await
    }

    async fn release(&self, session_id: &str, owner: &str) -> Result<bool, RegistryError> {
        let mut conn = self.get_connection().await?;
        let released: i64 = self
            .release_script
            .key(owner_key(session_id))
            .key(close_key(session_id))
            .arg(owner)
            .invoke_async(&mut conn)
            .await?;
        Ok(released == 1)
    }

    async fn owner(&self, session_id: &str) -> Result<Option<String>, RegistryError> {
        let mut conn = self.get_connection().await?;
        let current: Option<String> = conn.get(owner_key(session_id)).await?;
        Ok(current)
    }

    async fn request_close(&self, session_id: &str) -> Result<(), RegistryError> {
        let mut conn = self.get_connection().await?;
        let _: () = redis::cmd("SET")
            .arg(close_key(session_id))
            .arg("1")
            .arg("PX")
            .arg(CLOSE_REQUEST_TTL_MS)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn close_requested(&self, session_id: &str) -> Result<bool, RegistryError> {
        let mut conn = self.get_connection().await?;
        let exists: bool = conn.exists(close_key(session_id)).await?;
        Ok(exists)
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
