//! Job lifecycle tracking
//!
//! `JobTracker` owns one job's progress record: it claims the per-kind
//! active slot at creation, publishes monotonic progress while the batch
//! runs, and performs the single terminal transition. It implements the
//! executor's sink/probe traits so a tracker can be handed straight to
//! [`run_chunked`](super::executor::run_chunked).

use crate::config::JobsConfig;
use crate::core::jobs::executor::{CancelProbe, ProgressSink};
use crate::core::jobs::types::{JobKind, JobProgress, JobStatus};
use crate::storage::progress::ProgressStore;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Tracks one job's lifecycle in the progress store
pub struct JobTracker {
    store: Arc<dyn ProgressStore>,
    kind: JobKind,
    job_id: String,
    /// In-process copy; the monotonic high-water mark lives here so store
    /// writes never go backwards even when chunk items complete out of
    /// order. Assumes a single executing worker per job, which the active
    /// slot guarantees.
    progress: Mutex<JobProgress>,
    /// Work item count, fixed at creation.
    total: usize,
    progress_ttl: Duration,
    slot_rearm: Duration,
}

impl JobTracker {
    /// Create a new job: claim the active slot for `kind`, write the
    /// initial running record, and return the tracker.
    ///
    /// Fails with [`TrackerError::Validation`] when `work_item_ids` is
    /// empty (percentage would be undefined) and with
    /// [`TrackerError::Conflict`] when another job of the same kind is
    /// genuinely active. A stale slot pointer, one whose job record has
    /// expired or already reached a terminal state, is reclaimed without
    /// manual intervention.
    pub async fn start(
        store: Arc<dyn ProgressStore>,
        kind: JobKind,
        work_item_ids: Vec<String>,
        config: &JobsConfig,
    ) -> Result<Self> {
        if work_item_ids.is_empty() {
            return Err(TrackerError::Validation(
                "cannot start a job with zero work items".to_string(),
            ));
        }

        let job_id = Uuid::new_v4().to_string();
        let slot_ttl = Duration::from_secs(config.slot_ttl_secs);

        if !store.acquire_active_slot(kind, &job_id, slot_ttl).await? {
            // The slot is taken. Reclaim it if the job behind it is gone
            // or already terminal; otherwise this is a real conflict.
            let stale_id = match store.read_active_slot(kind).await? {
                Some(existing_id) => match store.read_progress(&existing_id).await? {
                    Some(existing) if !existing.status.is_terminal() => {
                        return Err(TrackerError::Conflict(format!(
                            "a {} job is already running",
                            kind.as_str()
                        )));
                    }
                    _ => Some(existing_id),
                },
                // The pointer expired between the acquire and the read.
                None => None,
            };

            debug!(kind = kind.as_str(), "reclaiming stale active slot");
            if let Some(stale_id) = stale_id {
                store.release_active_slot(kind, &stale_id, None).await?;
            }
            if !store.acquire_active_slot(kind, &job_id, slot_ttl).await? {
                // Lost the re-acquire race to another starter.
                return Err(TrackerError::Conflict(format!(
                    "a {} job is already running",
                    kind.as_str()
                )));
            }
        }

        let total = work_item_ids.len();
        let progress = JobProgress::new(job_id.clone(), kind, work_item_ids);
        let tracker = Self {
            store,
            kind,
            job_id,
            progress: Mutex::new(progress),
            total,
            progress_ttl: Duration::from_secs(config.progress_ttl_secs),
            slot_rearm: Duration::from_secs(config.slot_rearm_secs),
        };
        tracker.write_current().await?;

        info!(
            job_id = %tracker.job_id,
            kind = kind.as_str(),
            total = tracker.total(),
            "job started"
        );
        Ok(tracker)
    }

    /// The job's opaque identifier
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Work item count fixed at creation
    pub fn total(&self) -> usize {
        self.total
    }

    async fn write_current(&self) -> Result<()> {
        let progress = self.progress.lock().await;
        self.store
            .write_progress(&self.job_id, &progress, self.progress_ttl)
            .await
    }

    /// Record and persist progress. Writes are monotonic: a stale count
    /// never overwrites a newer one.
    pub async fn publish_progress(&self, processed: usize) -> Result<()> {
        let snapshot = {
            let mut progress = self.progress.lock().await;
            if processed <= progress.processed {
                return Ok(());
            }
            progress.advance(processed);
            progress.clone()
        };
        self.store
            .write_progress(&self.job_id, &snapshot, self.progress_ttl)
            .await
    }

    /// Terminal transition to `completed`. The active slot is re-armed
    /// with a short TTL instead of deleted so an immediately-following
    /// poll of the active pointer still resolves this job.
    pub async fn complete(&self, summary: Option<serde_json::Value>) -> Result<()> {
        {
            let mut progress = self.progress.lock().await;
            progress.status = JobStatus::Completed;
            progress.completed_at = Some(Utc::now());
            progress.summary = summary;
        }
        self.write_current().await?;
        self.store
            .release_active_slot(self.kind, &self.job_id, Some(self.slot_rearm))
            .await?;
        info!(job_id = %self.job_id, "job completed");
        Ok(())
    }

    /// Terminal transition to `failed`. The slot is deleted immediately
    /// so a retry can start right away.
    pub async fn fail(&self, message: &str) -> Result<()> {
        {
            let mut progress = self.progress.lock().await;
            progress.status = JobStatus::Failed;
            progress.completed_at = Some(Utc::now());
            progress.error = Some(message.to_string());
        }
        self.write_current().await?;
        self.store
            .release_active_slot(self.kind, &self.job_id, None)
            .await?;
        error!(job_id = %self.job_id, error = message, "job failed");
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for JobTracker {
    async fn publish(&self, processed: usize, _total: usize) {
        // Progress publication is best effort; a dropped update is
        // recovered by the next one.
        if let Err(e) = self.publish_progress(processed).await {
            warn!(job_id = %self.job_id, "failed to publish progress: {}", e);
        }
    }
}

#[async_trait]
impl CancelProbe for JobTracker {
    async fn is_cancelled(&self) -> bool {
        match self.store.cancel_requested(&self.job_id).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                warn!(job_id = %self.job_id, "cancel probe failed: {}", e);
                false
            }
        }
    }
}

/// Request cancellation of a running job.
///
/// Advisory: the flag is observed at chunk boundaries. Returns the job id
/// when a running job was flagged, `None` when there was nothing to
/// cancel (no active job, or the active job already reached a terminal
/// state).
pub async fn request_cancel(
    store: &dyn ProgressStore,
    kind: JobKind,
    config: &JobsConfig,
) -> Result<Option<String>> {
    let Some(job_id) = store.read_active_slot(kind).await? else {
        return Ok(None);
    };
    match store.read_progress(&job_id).await? {
        Some(progress) if !progress.status.is_terminal() => {
            store
                .set_cancel_flag(&job_id, Duration::from_secs(config.cancel_ttl_secs))
                .await?;
            info!(job_id = %job_id, kind = kind.as_str(), "cancellation requested");
            Ok(Some(job_id))
        }
        _ => Ok(None),
    }
}
