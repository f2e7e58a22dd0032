//! Import pipeline
//!
//! Parses synchronously (so validation errors reach the caller before a
//! job id is issued), then persists in the background while the caller
//! polls the job record. Persistence batches are a storage concern (keep
//! individual write transactions small), unrelated to the batch
//! executor's concurrency bounding.

use crate::config::JobsConfig;
use crate::core::import::parser::parse_csv;
use crate::core::import::types::{ImportOutcome, ImportReceipt, RowError};
use crate::core::jobs::tracker::JobTracker;
use crate::core::jobs::types::{JobKind, JobProgress};
use crate::storage::progress::ProgressStore;
use crate::storage::repository::{
    ImportHistoryStore, ProductRepository, ProductUpsert, TagStore, UpsertCounts,
};
use crate::utils::error::{Result, TrackerError};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Well-known classification tag applied to records flagged as sold by
/// Amazon at import time
const AMAZON_TAG_NAME: &str = "Amazon";
const AMAZON_TAG_KIND: &str = "seller";

pub struct ImportPipeline {
    progress: Arc<dyn ProgressStore>,
    repository: Arc<dyn ProductRepository>,
    tags: Arc<dyn TagStore>,
    history: Arc<dyn ImportHistoryStore>,
    config: JobsConfig,
}

impl ImportPipeline {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        repository: Arc<dyn ProductRepository>,
        tags: Arc<dyn TagStore>,
        history: Arc<dyn ImportHistoryStore>,
        config: JobsConfig,
    ) -> Self {
        Self {
            progress,
            repository,
            tags,
            history,
            config,
        }
    }

    /// Accept an uploaded CSV: parse it, claim the import slot, and kick
    /// off background persistence. Returns as soon as the job exists.
    pub async fn start_import(
        self: &Arc<Self>,
        file_bytes: &[u8],
        filename: Option<String>,
    ) -> Result<ImportReceipt> {
        let parsed = parse_csv(file_bytes)?;
        if parsed.valid.is_empty() {
            return Err(TrackerError::Validation(format!(
                "no importable rows: {} of {} rows failed validation",
                parsed.errors.len(),
                parsed.total_rows
            )));
        }

        let work_item_ids: Vec<String> = parsed.valid.iter().map(|r| r.asin.clone()).collect();
        let tracker = JobTracker::start(
            self.progress.clone(),
            JobKind::Import,
            work_item_ids,
            &self.config,
        )
        .await?;

        let receipt = ImportReceipt {
            job_id: tracker.job_id().to_string(),
            total: parsed.valid.len(),
        };

        let pipeline = self.clone();
        tokio::spawn(async move {
            // The caller already holds a job id; any escape here must
            // still resolve the job to a terminal state.
            if let Err(e) = pipeline
                .persist(&tracker, parsed.valid, parsed.errors, parsed.total_rows, filename)
                .await
            {
                error!(job_id = %tracker.job_id(), "import persistence failed: {}", e);
                if let Err(fail_err) = tracker.fail(&e.to_string()).await {
                    error!(
                        job_id = %tracker.job_id(),
                        "could not mark import job failed: {}", fail_err
                    );
                }
            }
        });

        Ok(receipt)
    }

    /// Read an import job's record
    pub async fn import_progress(&self, job_id: &str) -> Result<JobProgress> {
        self.progress
            .read_progress(job_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("no import job {}", job_id)))
    }

    async fn persist(
        &self,
        tracker: &JobTracker,
        records: Vec<ProductUpsert>,
        row_errors: Vec<RowError>,
        total_rows: usize,
        filename: Option<String>,
    ) -> Result<()> {
        let mut counts = UpsertCounts::default();
        let mut amazon_tag: Option<String> = None;
        let mut processed = 0usize;
        let batch_size = self.config.import_batch_size.max(1);

        for batch in records.chunks(batch_size) {
            counts.add(self.repository.upsert_batch(batch).await?);

            for record in batch.iter().filter(|r| r.sold_by_amazon == Some(true)) {
                let tag_id = match &amazon_tag {
                    Some(id) => id.clone(),
                    None => {
                        let id = self
                            .tags
                            .get_or_create_tag(AMAZON_TAG_NAME, AMAZON_TAG_KIND)
                            .await?;
                        amazon_tag = Some(id.clone());
                        id
                    }
                };
                self.tags.associate(&record.asin, &tag_id).await?;
            }

            processed += batch.len();
            tracker.publish_progress(processed).await?;
        }

        let failed = row_errors.len();
        let accounted = counts.inserted as usize + counts.updated as usize + failed;
        if accounted < total_rows {
            warn!(
                job_id = %tracker.job_id(),
                accounted, total_rows,
                "import outcome does not account for every row"
            );
        }

        let cap = self.config.max_surfaced_errors;
        let mut outcome = ImportOutcome {
            job_id: Some(tracker.job_id().to_string()),
            filename,
            total_rows,
            inserted: counts.inserted,
            updated: counts.updated,
            failed,
            errors: row_errors.iter().take(cap).cloned().collect(),
            error_artifact_id: None,
        };
        if row_errors.len() > cap {
            let artifact_id = self
                .history
                .store_error_artifact(tracker.job_id(), &row_errors[cap..])
                .await?;
            outcome.error_artifact_id = Some(artifact_id);
        }

        self.history.record_import(&outcome).await?;
        tracker
            .complete(Some(serde_json::to_value(&outcome)?))
            .await?;

        info!(
            job_id = %tracker.job_id(),
            inserted = counts.inserted,
            updated = counts.updated,
            failed,
            "import finished"
        );
        Ok(())
    }
}
