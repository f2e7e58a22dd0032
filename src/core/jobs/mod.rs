//! Background job infrastructure
//!
//! Generic machinery shared by every batch pipeline: chunked execution,
//! progress/slot bookkeeping, and the polling-friendly job record types.

pub mod executor;
pub mod tracker;
pub mod types;

pub use executor::{run_chunked, BatchOptions, CancelProbe, Disposition, NeverCancel, ProgressSink};
pub use tracker::{request_cancel, JobTracker};
pub use types::{JobKind, JobProgress, JobStatus};
