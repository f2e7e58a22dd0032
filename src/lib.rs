//! # asin-tracker
//!
//! Async job-and-progress subsystem for an Amazon product tracker.
//!
//! The crate owns two long-running batch pipelines and the machinery
//! around them:
//!
//! - **Import**: parse an uploaded CSV export into validated product
//!   records, upsert them in batches, and report row-level errors.
//! - **Eligibility**: fan ASINs out against the Selling Partner API
//!   listings-restrictions endpoint with bounded concurrency and derive a
//!   selling status per product.
//!
//! Both run as background jobs observed by polling: callers receive a job
//! id immediately and read monotonic progress from a TTL-bound progress
//! store (Redis in production) until the job reaches a terminal state.
//! One job per kind runs at a time, enforced by an atomic active-slot
//! claim in the store.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use asin_tracker::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     server::run_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use utils::error::{Result, TrackerError};
