//! Selling Partner API restrictions client
//!
//! Issues signed listings-restrictions lookups with LWA token refresh,
//! retry with exponential backoff on throttling and server errors, and
//! translation of the provider's restriction reasons into
//! [`SellingStatus`].

use crate::config::SpApiConfig;
use crate::core::eligibility::types::SellingStatus;
use crate::core::spapi::auth::LwaAuth;
use crate::core::spapi::sigv4::SigV4Signer;
use crate::core::spapi::types::{RestrictionsResponse, SpApiErrorResponse};
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const RESTRICTIONS_PATH: &str = "/listings/2021-08-01/restrictions";

/// Eligibility lookup seam; the pipeline depends on this, not on the
/// concrete HTTP client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RestrictionsClient: Send + Sync {
    /// Derive the selling status for one ASIN. An `Err` means the lookup
    /// could not be completed (retries exhausted), not a confirmed
    /// classification.
    async fn check(&self, asin: &str) -> Result<SellingStatus>;
}

pub struct SpApiClient {
    config: SpApiConfig,
    auth: LwaAuth,
    signer: SigV4Signer,
    http_client: reqwest::Client,
}

impl SpApiClient {
    pub fn new(config: SpApiConfig) -> Self {
        let auth = LwaAuth::new(&config);
        let signer = SigV4Signer::new(
            config.aws_access_key.clone(),
            config.aws_secret_key.clone(),
            config.region.clone(),
        );
        Self {
            config,
            auth,
            signer,
            http_client: reqwest::Client::new(),
        }
    }

    fn restrictions_url(&self, asin: &str) -> Result<String> {
        let mut url = url::Url::parse(&self.config.endpoint)
            .map_err(|e| TrackerError::Config(format!("invalid SP-API endpoint: {}", e)))?;
        url.set_path(RESTRICTIONS_PATH);
        url.query_pairs_mut()
            .append_pair("asin", asin)
            .append_pair("sellerId", &self.config.seller_id)
            .append_pair("marketplaceIds", &self.config.marketplace_id)
            .append_pair("conditionType", "new_new");
        Ok(url.into())
    }

    async fn send_signed(&self, url: &str) -> Result<reqwest::Response> {
        let token = self.auth.access_token().await?;
        let mut headers = HashMap::new();
        // The token header is part of the signed header set.
        headers.insert("x-amz-access-token".to_string(), token);

        let signed = self
            .signer
            .sign_request("GET", url, &headers, "", Utc::now())?;

        let mut request = self.http_client.get(url);
        for (name, value) in &signed {
            // reqwest sets Host itself from the URL.
            if !name.eq_ignore_ascii_case("host") {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        Ok(request.send().await?)
    }

    /// Backoff for the attempt just failed, 1-indexed. An explicit
    /// `Retry-After` wins over the computed delay.
    fn retry_delay(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        if let Some(seconds) = retry_after {
            return Duration::from_secs(seconds);
        }
        let base = self.config.retry_base_delay_ms;
        let backoff = base.saturating_mul(2u64.saturating_pow(attempt - 1));
        let jitter = rand::thread_rng().gen_range(0..250);
        Duration::from_millis(backoff + jitter)
    }
}

fn retry_after_seconds(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Translate a restrictions payload into a domain status.
///
/// No restrictions means the seller may list the item. An unrecognized
/// or missing reason code maps to `Unknown` rather than failing.
pub fn map_restrictions(response: &RestrictionsResponse) -> SellingStatus {
    if response.restrictions.is_empty() {
        return SellingStatus::Allowed;
    }
    for restriction in &response.restrictions {
        for reason in &restriction.reasons {
            match reason.reason_code.as_deref() {
                Some("APPROVAL_REQUIRED") => {
                    let invoice = reason
                        .message
                        .as_deref()
                        .map(|m| m.to_lowercase().contains("invoice"))
                        .unwrap_or(false);
                    return if invoice {
                        SellingStatus::RequiresInvoice
                    } else {
                        SellingStatus::Gated
                    };
                }
                Some("NOT_ELIGIBLE") => return SellingStatus::Restricted,
                Some("ASIN_NOT_FOUND") => return SellingStatus::Unknown,
                _ => continue,
            }
        }
    }
    SellingStatus::Unknown
}

#[async_trait]
impl RestrictionsClient for SpApiClient {
    async fn check(&self, asin: &str) -> Result<SellingStatus> {
        let url = self.restrictions_url(asin)?;
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let response = match self.send_signed(&url).await {
                Ok(response) => response,
                Err(e) => {
                    if attempt == max_attempts {
                        return Err(e);
                    }
                    warn!(asin, attempt, "restrictions request failed: {}", e);
                    tokio::time::sleep(self.retry_delay(attempt, None)).await;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let parsed: RestrictionsResponse = response.json().await?;
                let mapped = map_restrictions(&parsed);
                debug!(asin, status = mapped.as_str(), "restriction lookup done");
                return Ok(mapped);
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt == max_attempts {
                    return Err(TrackerError::SpApi(format!(
                        "restrictions lookup for {} exhausted {} attempts, last status {}",
                        asin, max_attempts, status
                    )));
                }
                let retry_after = retry_after_seconds(&response);
                warn!(asin, attempt, %status, "throttled or server error, retrying");
                tokio::time::sleep(self.retry_delay(attempt, retry_after)).await;
                continue;
            }

            // Client errors are not retried. An unknown-ASIN error still
            // produces a classification rather than a failure.
            let body = response.text().await.unwrap_or_default();
            if let Ok(envelope) = serde_json::from_str::<SpApiErrorResponse>(&body) {
                let not_found = envelope.errors.iter().any(|e| {
                    e.code
                        .as_deref()
                        .map(|c| c.contains("NOT_FOUND"))
                        .unwrap_or(false)
                });
                if not_found {
                    return Ok(SellingStatus::Unknown);
                }
            }
            return Err(TrackerError::SpApi(format!(
                "restrictions lookup for {} failed with {}: {}",
                asin, status, body
            )));
        }
        unreachable!("retry loop always returns")
    }
}
