//! Eligibility domain types

use serde::{Deserialize, Serialize};

/// Derived selling eligibility for one product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellingStatus {
    /// No restriction reported
    Allowed,
    /// Listing requires approval
    Gated,
    /// Approval requires supplier invoices
    RequiresInvoice,
    /// Not eligible to sell
    Restricted,
    /// The provider reported something this crate does not recognize,
    /// including an unknown ASIN
    Unknown,
}

impl SellingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellingStatus::Allowed => "allowed",
            SellingStatus::Gated => "gated",
            SellingStatus::RequiresInvoice => "requires_invoice",
            SellingStatus::Restricted => "restricted",
            SellingStatus::Unknown => "unknown",
        }
    }
}

/// Candidate selection for an eligibility run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckMode {
    /// Products never successfully checked (no check timestamp)
    NotChecked,
    /// Products whose last known status equals the given value
    WithStatus(SellingStatus),
    /// The N most recently created products, for ad hoc spot checks
    Recent(usize),
}

/// Immediate response to an accepted eligibility run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReceipt {
    pub job_id: String,
    pub total_items: usize,
}

/// Result of a cancellation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}
