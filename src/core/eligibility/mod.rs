//! Selling-eligibility processing

pub mod pipeline;
pub mod types;

pub use pipeline::EligibilityPipeline;
pub use types::{CancelOutcome, CheckMode, CheckReceipt, SellingStatus};
