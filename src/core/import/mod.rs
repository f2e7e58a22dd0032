//! CSV product import

pub mod parser;
pub mod pipeline;
pub mod types;

pub use pipeline::ImportPipeline;
pub use types::{ImportOutcome, ImportReceipt, RowError};
