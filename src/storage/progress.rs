//! Progress store interface
//!
//! Ephemeral, TTL-bound storage for job progress records, the per-kind
//! active-slot pointer, and cancellation flags. The interface is kept
//! narrow on purpose: any TTL-capable key-value store reachable from all
//! process instances satisfies it.
//!
//! The store itself never retries; connectivity failures surface as
//! errors and callers decide whether to retry.

use crate::core::jobs::types::{JobKind, JobProgress};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key for a job progress record
pub fn progress_key(job_id: &str) -> String {
    format!("jobs:progress:{}", job_id)
}

/// Key for the per-kind active-slot pointer
pub fn active_slot_key(kind: JobKind) -> String {
    format!("jobs:{}:active", kind.as_str())
}

/// Key for a job cancellation flag
pub fn cancel_key(job_id: &str) -> String {
    format!("jobs:cancel:{}", job_id)
}

/// TTL-bound key-value storage for job state
///
/// One implementation backs production (Redis); an in-memory variant
/// serves tests and single-node deployments.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Atomically claim the active slot for a job kind.
    ///
    /// Set-if-absent with TTL. Returns whether this caller now owns the
    /// slot. Concurrent callers see exactly one winner.
    async fn acquire_active_slot(&self, kind: JobKind, job_id: &str, ttl: Duration)
        -> Result<bool>;

    /// Read the job id the active slot currently points at, if any.
    async fn read_active_slot(&self, kind: JobKind) -> Result<Option<String>>;

    /// Release the active slot, but only while it still points at
    /// `job_id`. A release that lost the slot to a stale-slot reclaim
    /// must leave the new owner untouched.
    ///
    /// `rearm: Some(ttl)` keeps the pointer alive for a short window after
    /// normal completion so immediately-following polls do not read
    /// "idle"; `None` deletes it right away (failure path, so a retry can
    /// start immediately).
    async fn release_active_slot(
        &self,
        kind: JobKind,
        job_id: &str,
        rearm: Option<Duration>,
    ) -> Result<()>;

    /// Upsert a job progress record with TTL.
    async fn write_progress(&self, job_id: &str, progress: &JobProgress, ttl: Duration)
        -> Result<()>;

    /// Read a job progress record. `None` means unknown or expired;
    /// the two are never distinguished.
    async fn read_progress(&self, job_id: &str) -> Result<Option<JobProgress>>;

    /// Raise the advisory cancellation flag for a job.
    async fn set_cancel_flag(&self, job_id: &str, ttl: Duration) -> Result<()>;

    /// Check whether cancellation was requested. The flag is left in
    /// place; it expires by TTL.
    async fn cancel_requested(&self, job_id: &str) -> Result<bool>;
}
