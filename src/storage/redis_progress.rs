//! Redis-backed progress store
//!
//! Production implementation of [`ProgressStore`] on top of a multiplexed
//! Redis connection. The active slot uses SET NX EX so concurrent job
//! starts race atomically inside Redis rather than in process memory.

use super::progress::{active_slot_key, cancel_key, progress_key, ProgressStore};
use crate::config::RedisConfig;
use crate::core::jobs::types::{JobKind, JobProgress};
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info};

// Release scripts check ownership and mutate in one round trip, so a job
// that lost its slot to a stale-slot reclaim cannot touch the new
// owner's pointer.
const DEL_IF_OWNED: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const EXPIRE_IF_OWNED: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

/// Redis connection wrapper for job state
#[derive(Debug, Clone)]
pub struct RedisProgressStore {
    connection: MultiplexedConnection,
}

impl RedisProgressStore {
    /// Connect to Redis and verify the connection with a PING
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to progress store");
        debug!("Redis URL: {}", Self::sanitize_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(TrackerError::Redis)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(TrackerError::Redis)?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(TrackerError::Redis)?;

        info!("Progress store connection established");
        Ok(Self { connection })
    }

    /// Sanitize Redis URL for logging (hide password)
    fn sanitize_url(url: &str) -> String {
        if let Ok(parsed) = url::Url::parse(url) {
            let mut sanitized = parsed.clone();
            if sanitized.password().is_some() {
                let _ = sanitized.set_password(Some("***"));
            }
            sanitized.to_string()
        } else {
            "invalid_url".to_string()
        }
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn acquire_active_slot(
        &self,
        kind: JobKind,
        job_id: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.connection.clone();
        let acquired: bool = redis::cmd("SET")
            .arg(active_slot_key(kind))
            .arg(job_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(TrackerError::Redis)?;
        Ok(acquired)
    }

    async fn read_active_slot(&self, kind: JobKind) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn
            .get(active_slot_key(kind))
            .await
            .map_err(TrackerError::Redis)?;
        Ok(value)
    }

    async fn release_active_slot(
        &self,
        kind: JobKind,
        job_id: &str,
        rearm: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.connection.clone();
        let key = active_slot_key(kind);
        let released: i64 = match rearm {
            Some(ttl) => {
                redis::Script::new(EXPIRE_IF_OWNED)
                    .key(&key)
                    .arg(job_id)
                    .arg(ttl.as_secs().max(1))
                    .invoke_async(&mut conn)
                    .await
                    .map_err(TrackerError::Redis)?
            }
            None => {
                redis::Script::new(DEL_IF_OWNED)
                    .key(&key)
                    .arg(job_id)
                    .invoke_async(&mut conn)
                    .await
                    .map_err(TrackerError::Redis)?
            }
        };
        if released == 0 {
            debug!(
                kind = kind.as_str(),
                job_id, "active slot no longer owned, release skipped"
            );
        }
        Ok(())
    }

    async fn write_progress(
        &self,
        job_id: &str,
        progress: &JobProgress,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(progress)?;
        let _: () = conn
            .set_ex(progress_key(job_id), payload, ttl.as_secs().max(1))
            .await
            .map_err(TrackerError::Redis)?;
        Ok(())
    }

    async fn read_progress(&self, job_id: &str) -> Result<Option<JobProgress>> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = conn
            .get(progress_key(job_id))
            .await
            .map_err(TrackerError::Redis)?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_cancel_flag(&self, job_id: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(cancel_key(job_id), "1", ttl.as_secs().max(1))
            .await
            .map_err(TrackerError::Redis)?;
        Ok(())
    }

    async fn cancel_requested(&self, job_id: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn
            .exists(cancel_key(job_id))
            .await
            .map_err(TrackerError::Redis)?;
        Ok(exists)
    }
}
