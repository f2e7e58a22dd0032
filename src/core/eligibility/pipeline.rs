//! Eligibility processing pipeline
//!
//! Selects candidate ASINs by mode, fans them out through the chunked
//! executor against the restrictions client, and persists one derived
//! status per item. A failed lookup leaves the item untouched so a later
//! "not yet checked" run picks it up again.

use crate::config::JobsConfig;
use crate::core::eligibility::types::{CancelOutcome, CheckMode, CheckReceipt, SellingStatus};
use crate::core::jobs::executor::{run_chunked, BatchOptions, Disposition};
use crate::core::jobs::tracker::{request_cancel, JobTracker};
use crate::core::jobs::types::{JobKind, JobProgress};
use crate::core::spapi::client::RestrictionsClient;
use crate::storage::progress::ProgressStore;
use crate::storage::repository::ProductRepository;
use crate::utils::error::{Result, TrackerError};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct EligibilityPipeline {
    progress: Arc<dyn ProgressStore>,
    repository: Arc<dyn ProductRepository>,
    client: Arc<dyn RestrictionsClient>,
    config: JobsConfig,
}

impl EligibilityPipeline {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        repository: Arc<dyn ProductRepository>,
        client: Arc<dyn RestrictionsClient>,
        config: JobsConfig,
    ) -> Self {
        Self {
            progress,
            repository,
            client,
            config,
        }
    }

    /// Start an eligibility run over the ASINs selected by `mode`.
    ///
    /// Returns immediately with a job id; fails with a conflict when a
    /// run is already active and with a validation error when the mode
    /// selects nothing.
    pub async fn start_check(self: &Arc<Self>, mode: CheckMode) -> Result<CheckReceipt> {
        let asins = self.repository.find_asins_by_mode(&mode).await?;
        if asins.is_empty() {
            return Err(TrackerError::Validation(
                "no products match the requested check mode".to_string(),
            ));
        }

        let tracker = JobTracker::start(
            self.progress.clone(),
            JobKind::EligibilityCheck,
            asins.clone(),
            &self.config,
        )
        .await?;
        let receipt = CheckReceipt {
            job_id: tracker.job_id().to_string(),
            total_items: asins.len(),
        };

        let pipeline = self.clone();
        tokio::spawn(async move {
            let options = BatchOptions {
                concurrency: pipeline.config.concurrency.max(1),
                chunk_delay: Duration::from_millis(pipeline.config.chunk_delay_ms),
            };

            let disposition = run_chunked(
                asins,
                &options,
                |asin| pipeline.check_one(asin),
                &tracker,
                &tracker,
            )
            .await;

            // A cancelled run is still a completed job, just one whose
            // processed count stopped short of total.
            if let Disposition::Cancelled(processed) = disposition {
                info!(
                    job_id = %tracker.job_id(),
                    processed,
                    "eligibility run cancelled"
                );
            }
            if let Err(e) = tracker.complete(None).await {
                error!(
                    job_id = %tracker.job_id(),
                    "could not mark eligibility job completed: {}", e
                );
            }
        });

        Ok(receipt)
    }

    /// One item: look up restrictions, persist on success, leave the
    /// item unchecked on any failure.
    async fn check_one(&self, asin: String) {
        match self.client.check(&asin).await {
            Ok(status) => {
                if let Err(e) = self
                    .repository
                    .update_selling_status(&asin, status, Utc::now())
                    .await
                {
                    warn!(asin = %asin, "could not persist selling status: {}", e);
                }
            }
            Err(e) => {
                warn!(asin = %asin, "eligibility lookup failed, leaving unchecked: {}", e);
            }
        }
    }

    /// Read a run's record, with the status breakdown recomputed from
    /// the record store on every call. Passing `None` resolves the
    /// currently active run.
    pub async fn check_status(&self, job_id: Option<&str>) -> Result<JobProgress> {
        let job_id = match job_id {
            Some(id) => id.to_string(),
            None => self
                .progress
                .read_active_slot(JobKind::EligibilityCheck)
                .await?
                .ok_or_else(|| {
                    TrackerError::NotFound("no active eligibility job".to_string())
                })?,
        };

        let mut record = self
            .progress
            .read_progress(&job_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("no eligibility job {}", job_id)))?;

        record.summary = Some(self.summarize(&record.work_item_ids).await?);
        Ok(record)
    }

    /// Status breakdown for exactly the job's item set, from current
    /// persisted truth rather than counts accumulated during the run.
    async fn summarize(&self, asins: &[String]) -> Result<serde_json::Value> {
        let statuses = self.repository.selling_statuses(asins).await?;

        let mut counts: HashMap<SellingStatus, usize> = HashMap::new();
        let mut checked = 0usize;
        for (_asin, status) in &statuses {
            if let Some(status) = status {
                *counts.entry(*status).or_default() += 1;
                checked += 1;
            }
        }

        let count = |s: SellingStatus| counts.get(&s).copied().unwrap_or(0);
        Ok(json!({
            "allowed": count(SellingStatus::Allowed),
            "gated": count(SellingStatus::Gated),
            "requires_invoice": count(SellingStatus::RequiresInvoice),
            "restricted": count(SellingStatus::Restricted),
            "unknown": count(SellingStatus::Unknown),
            "unchecked": asins.len() - checked,
        }))
    }

    /// Request cancellation of the active run, if any
    pub async fn cancel(&self) -> Result<CancelOutcome> {
        let job_id = request_cancel(
            self.progress.as_ref(),
            JobKind::EligibilityCheck,
            &self.config,
        )
        .await?;
        Ok(CancelOutcome {
            cancelled: job_id.is_some(),
            job_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::jobs::types::JobStatus;
    use crate::storage::memory::MemoryProgressStore;
    use crate::storage::memory_repository::MemoryProductRepository;
    use crate::storage::repository::ProductUpsert;
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;
    use tokio::sync::Mutex;

    /// Scripted client: per-ASIN result, default `Allowed`
    #[derive(Default)]
    struct ScriptedClient {
        results: StdHashMap<String, Result<SellingStatus>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn failing(asin: &str) -> Self {
            let mut client = Self::default();
            client.results.insert(
                asin.to_string(),
                Err(TrackerError::SpApi("simulated outage".to_string())),
            );
            client
        }
    }

    #[async_trait]
    impl RestrictionsClient for ScriptedClient {
        async fn check(&self, asin: &str) -> Result<SellingStatus> {
            self.calls.lock().await.push(asin.to_string());
            match self.results.get(asin) {
                Some(Ok(status)) => Ok(*status),
                Some(Err(e)) => Err(TrackerError::SpApi(e.to_string())),
                None => Ok(SellingStatus::Allowed),
            }
        }
    }

    struct Fixture {
        pipeline: Arc<EligibilityPipeline>,
        progress: Arc<MemoryProgressStore>,
        repository: Arc<MemoryProductRepository>,
    }

    async fn fixture(client: ScriptedClient, asins: &[&str]) -> Fixture {
        let progress = Arc::new(MemoryProgressStore::new());
        let repository = Arc::new(MemoryProductRepository::new());
        let upserts: Vec<ProductUpsert> = asins
            .iter()
            .map(|asin| ProductUpsert {
                asin: asin.to_string(),
                ..Default::default()
            })
            .collect();
        repository.upsert_batch(&upserts).await.unwrap();

        let mut config = JobsConfig::default();
        config.chunk_delay_ms = 0;
        let pipeline = Arc::new(EligibilityPipeline::new(
            progress.clone(),
            repository.clone(),
            Arc::new(client),
            config,
        ));
        Fixture {
            pipeline,
            progress,
            repository,
        }
    }

    async fn await_terminal(progress: &MemoryProgressStore, job_id: &str) -> JobProgress {
        for _ in 0..200 {
            if let Some(record) = progress.read_progress(job_id).await.unwrap() {
                if record.status.is_terminal() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    #[tokio::test]
    async fn test_run_checks_all_items_and_persists_statuses() {
        let f = fixture(
            ScriptedClient::default(),
            &["B000000001", "B000000002", "B000000003"],
        )
        .await;

        let receipt = f.pipeline.start_check(CheckMode::NotChecked).await.unwrap();
        assert_eq!(receipt.total_items, 3);

        let record = await_terminal(&f.progress, &receipt.job_id).await;
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.processed, 3);

        let status = f.pipeline.check_status(Some(&receipt.job_id)).await.unwrap();
        let summary = status.summary.unwrap();
        assert_eq!(summary["allowed"], 3);
        assert_eq!(summary["unchecked"], 0);
    }

    #[tokio::test]
    async fn test_failed_lookup_leaves_item_unchecked() {
        let f = fixture(
            ScriptedClient::failing("B000000002"),
            &["B000000001", "B000000002"],
        )
        .await;

        let receipt = f.pipeline.start_check(CheckMode::NotChecked).await.unwrap();
        let record = await_terminal(&f.progress, &receipt.job_id).await;
        // Failed items still count as processed.
        assert_eq!(record.processed, 2);

        // The failed item looks identical to a never-checked one.
        let unchecked = f
            .repository
            .find_asins_by_mode(&CheckMode::NotChecked)
            .await
            .unwrap();
        assert_eq!(unchecked, vec!["B000000002"]);

        let status = f.pipeline.check_status(Some(&receipt.job_id)).await.unwrap();
        let summary = status.summary.unwrap();
        assert_eq!(summary["allowed"], 1);
        assert_eq!(summary["unchecked"], 1);
    }

    #[tokio::test]
    async fn test_empty_selection_is_a_validation_error() {
        let f = fixture(ScriptedClient::default(), &[]).await;
        let result = f.pipeline.start_check(CheckMode::NotChecked).await;
        assert!(matches!(result, Err(TrackerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_concurrent_start_conflicts() {
        let f = fixture(
            ScriptedClient::default(),
            &["B000000001", "B000000002", "B000000003", "B000000004"],
        )
        .await;

        // Hold the slot open without running anything behind it.
        let blocker = JobTracker::start(
            f.progress.clone(),
            JobKind::EligibilityCheck,
            vec!["B000000001".to_string()],
            &JobsConfig::default(),
        )
        .await
        .unwrap();

        let second = f.pipeline.start_check(CheckMode::NotChecked).await;
        assert!(matches!(second, Err(TrackerError::Conflict(_))));

        // After completion a new run starts without waiting for TTLs.
        blocker.complete(None).await.unwrap();
        assert!(f.pipeline.start_check(CheckMode::NotChecked).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_with_nothing_running() {
        let f = fixture(ScriptedClient::default(), &["B000000001"]).await;
        let outcome = f.pipeline.cancel().await.unwrap();
        assert!(!outcome.cancelled);
        assert_eq!(outcome.job_id, None);
    }

    #[tokio::test]
    async fn test_status_resolves_active_job_without_id() {
        let f = fixture(ScriptedClient::default(), &["B000000001", "B000000002"]).await;
        let receipt = f.pipeline.start_check(CheckMode::NotChecked).await.unwrap();

        let status = f.pipeline.check_status(None).await;
        match status {
            Ok(record) => assert_eq!(record.job_id, receipt.job_id),
            // The run may already have finished and re-armed the slot.
            Err(TrackerError::NotFound(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
        await_terminal(&f.progress, &receipt.job_id).await;
    }

    #[tokio::test]
    async fn test_recheck_by_prior_status() {
        let f = fixture(ScriptedClient::default(), &["B000000001", "B000000002"]).await;
        f.repository
            .update_selling_status("B000000001", SellingStatus::Gated, Utc::now())
            .await
            .unwrap();

        let receipt = f
            .pipeline
            .start_check(CheckMode::WithStatus(SellingStatus::Gated))
            .await
            .unwrap();
        assert_eq!(receipt.total_items, 1);

        let record = await_terminal(&f.progress, &receipt.job_id).await;
        assert_eq!(record.work_item_ids, vec!["B000000001"]);
    }
}
