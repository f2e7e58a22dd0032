//! In-memory progress store
//!
//! TTL-capable [`ProgressStore`] backed by a mutex-guarded map. Used by
//! the unit tests and usable for single-node deployments where Redis is
//! not worth running. Expiry is checked lazily on read and on
//! set-if-absent, which is enough to satisfy the store contract.

use super::progress::{active_slot_key, cancel_key, progress_key, ProgressStore};
use crate::core::jobs::types::{JobKind, JobProgress};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Process-local progress store
#[derive(Default)]
pub struct MemoryProgressStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryProgressStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    async fn set(&self, key: String, value: String, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.live() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn acquire_active_slot(
        &self,
        kind: JobKind,
        job_id: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let key = active_slot_key(kind);
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get(&key) {
            if existing.live() {
                return Ok(false);
            }
        }
        entries.insert(
            key,
            Entry {
                value: job_id.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn read_active_slot(&self, kind: JobKind) -> Result<Option<String>> {
        Ok(self.get(&active_slot_key(kind)).await)
    }

    async fn release_active_slot(
        &self,
        kind: JobKind,
        job_id: &str,
        rearm: Option<Duration>,
    ) -> Result<()> {
        let key = active_slot_key(kind);
        let mut entries = self.entries.lock().await;
        let owned = entries
            .get(&key)
            .is_some_and(|entry| entry.live() && entry.value == job_id);
        if !owned {
            return Ok(());
        }
        match rearm {
            Some(ttl) => {
                if let Some(entry) = entries.get_mut(&key) {
                    entry.expires_at = Instant::now() + ttl;
                }
            }
            None => {
                entries.remove(&key);
            }
        }
        Ok(())
    }

    async fn write_progress(
        &self,
        job_id: &str,
        progress: &JobProgress,
        ttl: Duration,
    ) -> Result<()> {
        let payload = serde_json::to_string(progress)?;
        self.set(progress_key(job_id), payload, ttl).await;
        Ok(())
    }

    async fn read_progress(&self, job_id: &str) -> Result<Option<JobProgress>> {
        match self.get(&progress_key(job_id)).await {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_cancel_flag(&self, job_id: &str, ttl: Duration) -> Result<()> {
        self.set(cancel_key(job_id), "1".to_string(), ttl).await;
        Ok(())
    }

    async fn cancel_requested(&self, job_id: &str) -> Result<bool> {
        Ok(self.get(&cancel_key(job_id)).await.is_some())
    }
}
