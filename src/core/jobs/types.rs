//! Job and progress types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of batch jobs, each with its own exclusive active slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Bulk CSV product import
    Import,
    /// Bulk selling-eligibility check
    EligibilityCheck,
}

impl JobKind {
    /// Stable token used in store keys
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Import => "import",
            JobKind::EligibilityCheck => "eligibility",
        }
    }
}

/// Job lifecycle status
///
/// Transitions are monotonic: `Running -> Completed` or
/// `Running -> Failed`. There is no way out of a terminal state except a
/// brand-new job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further progress updates are expected
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One run of a batch operation, tracked in the progress store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    /// Opaque unique identifier generated at job creation
    pub job_id: String,
    /// Which batch kind this job belongs to
    pub kind: JobKind,
    /// Lifecycle status
    pub status: JobStatus,
    /// Work item count, fixed at creation
    pub total: usize,
    /// Items attempted so far (success and per-item failure both count)
    pub processed: usize,
    /// Derived completion percentage, recomputed on every write
    pub percentage: u8,
    pub started_at: DateTime<Utc>,
    /// Set exactly once, at the first terminal transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Present only when `status == Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Ordered item identifiers belonging to this job, kept so derived
    /// summaries can be recomputed on demand
    pub work_item_ids: Vec<String>,
    /// Derived aggregate; for eligibility jobs it is computed at read
    /// time and never persisted, for imports the final outcome is written
    /// here at the terminal transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
}

impl JobProgress {
    /// Create a fresh running job. `total` must be non-zero; callers
    /// validate that before construction.
    pub fn new(job_id: String, kind: JobKind, work_item_ids: Vec<String>) -> Self {
        let total = work_item_ids.len();
        Self {
            job_id,
            kind,
            status: JobStatus::Running,
            total,
            processed: 0,
            percentage: 0,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            work_item_ids,
            summary: None,
        }
    }

    /// Record progress. `processed` is clamped to `total` and never
    /// decreases.
    pub fn advance(&mut self, processed: usize) {
        let processed = processed.min(self.total).max(self.processed);
        self.processed = processed;
        self.percentage = percentage(processed, self.total);
    }
}

/// Completion percentage, rounded half away from zero
pub fn percentage(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds_not_truncates() {
        assert_eq!(percentage(33, 100), 33);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        // .5 boundary rounds up
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn test_advance_is_monotonic_and_bounded() {
        let mut progress = JobProgress::new(
            "j1".to_string(),
            JobKind::EligibilityCheck,
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
        );

        progress.advance(2);
        assert_eq!(progress.processed, 2);
        assert_eq!(progress.percentage, 50);

        // Never decreases
        progress.advance(1);
        assert_eq!(progress.processed, 2);

        // Never exceeds total
        progress.advance(10);
        assert_eq!(progress.processed, 4);
        assert_eq!(progress.percentage, 100);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_progress_serialization_shape() {
        let progress = JobProgress::new(
            "j1".to_string(),
            JobKind::Import,
            vec!["B000000001".into()],
        );
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["kind"], "import");
        assert_eq!(json["total"], 1);
        // Optional fields are omitted while unset
        assert!(json.get("error").is_none());
        assert!(json.get("completed_at").is_none());
    }
}
