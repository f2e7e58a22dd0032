//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::eligibility::EligibilityPipeline;
use crate::core::import::ImportPipeline;
use std::sync::Arc;

/// HTTP server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Tracker configuration (shared read-only)
    pub config: Arc<Config>,
    /// CSV import pipeline
    pub imports: Arc<ImportPipeline>,
    /// Selling-eligibility pipeline
    pub eligibility: Arc<EligibilityPipeline>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        imports: Arc<ImportPipeline>,
        eligibility: Arc<EligibilityPipeline>,
    ) -> Self {
        Self {
            config,
            imports,
            eligibility,
        }
    }
}
