//! Import pipeline types

use serde::{Deserialize, Serialize};

/// One rejected CSV row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// 1-indexed row number including the header row, so the first data
    /// row is row 2
    pub row: usize,
    pub reason: String,
    /// Raw row text when it could be recovered, for operator triage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_row: Option<String>,
}

/// Final aggregate of one import run.
///
/// Written into the job record's `summary` at the terminal transition and
/// recorded durably in the import history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Data rows in the file, header excluded
    pub total_rows: usize,
    pub inserted: u64,
    pub updated: u64,
    pub failed: usize,
    /// Row errors up to the surfaced cap; overflow lives in the artifact
    pub errors: Vec<RowError>,
    /// Reference to the overflow error artifact, when one was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_artifact_id: Option<String>,
}

/// Immediate response to an accepted import request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReceipt {
    pub job_id: String,
    /// Valid records queued for persistence
    pub total: usize,
}
