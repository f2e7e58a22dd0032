//! Record store collaborator interfaces
//!
//! Persistent storage of products, tags, and import history is an
//! external collaborator of this crate. These traits capture exactly the
//! surface the batch subsystem consumes; the CRUD/HTTP layer around the
//! record store lives elsewhere.

use crate::core::eligibility::types::{CheckMode, SellingStatus};
use crate::core::import::types::{ImportOutcome, RowError};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incoming product fields for an upsert.
///
/// Every field except the ASIN is optional: absent fields must not
/// overwrite previously stored values (null-preserving upsert).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpsert {
    /// Mandatory identifier, uppercased 10-character token
    pub asin: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    /// Canonical product URL; recomputed from the ASIN when absent
    pub amazon_url: Option<String>,
    pub price: Option<f64>,
    pub buy_box_price: Option<f64>,
    pub fba_fee: Option<f64>,
    pub referral_fee: Option<f64>,
    pub rating: Option<f64>,
    pub monthly_revenue: Option<f64>,
    pub bsr: Option<i64>,
    pub review_count: Option<i64>,
    pub seller_count: Option<i64>,
    pub monthly_sales: Option<i64>,
    /// First entry of the fulfillment column (multi-value in exports)
    pub fulfillment: Option<String>,
    /// Import-time flag driving the "Amazon" classification tag
    pub sold_by_amazon: Option<bool>,
}

/// Canonical product URL derived deterministically from the ASIN
pub fn canonical_amazon_url(asin: &str) -> String {
    format!("https://www.amazon.com/dp/{}", asin)
}

/// A stored product record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub asin: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub amazon_url: String,
    pub price: Option<f64>,
    pub buy_box_price: Option<f64>,
    pub fba_fee: Option<f64>,
    pub referral_fee: Option<f64>,
    pub rating: Option<f64>,
    pub monthly_revenue: Option<f64>,
    pub bsr: Option<i64>,
    pub review_count: Option<i64>,
    pub seller_count: Option<i64>,
    pub monthly_sales: Option<i64>,
    pub fulfillment: Option<String>,
    /// Last known selling eligibility, if ever checked
    pub selling_status: Option<SellingStatus>,
    /// When the eligibility was last checked; `None` means never checked
    /// (a failed check deliberately leaves this untouched)
    pub checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts returned by a batch upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertCounts {
    /// Accumulate counts from another batch
    pub fn add(&mut self, other: UpsertCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

/// Product record store
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Upsert a batch of records keyed by ASIN with null-preserving
    /// field semantics.
    async fn upsert_batch(&self, records: &[ProductUpsert]) -> Result<UpsertCounts>;

    /// Resolve the candidate ASINs for an eligibility run.
    async fn find_asins_by_mode(&self, mode: &CheckMode) -> Result<Vec<String>>;

    /// Current selling statuses for exactly the given ASINs, in no
    /// particular order. Unknown ASINs are omitted.
    async fn selling_statuses(
        &self,
        asins: &[String],
    ) -> Result<Vec<(String, Option<SellingStatus>)>>;

    /// Persist a derived selling status and its check timestamp.
    async fn update_selling_status(
        &self,
        asin: &str,
        status: SellingStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Tag association store
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Find or create a tag; creation is idempotent per (name, kind).
    async fn get_or_create_tag(&self, name: &str, kind: &str) -> Result<String>;

    /// Associate a product with a tag; duplicate associations are
    /// silently absorbed.
    async fn associate(&self, asin: &str, tag_id: &str) -> Result<()>;
}

/// Durable import history, separate from the ephemeral job record
#[async_trait]
pub trait ImportHistoryStore: Send + Sync {
    /// Record a finished import's outcome.
    async fn record_import(&self, outcome: &ImportOutcome) -> Result<()>;

    /// Persist row errors beyond the surfaced cap; returns an artifact
    /// id callers can reference.
    async fn store_error_artifact(&self, job_id: &str, errors: &[RowError]) -> Result<String>;
}
