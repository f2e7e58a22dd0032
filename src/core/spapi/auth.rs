//! Login with Amazon token exchange
//!
//! Exchanges the long-lived refresh token for a short-lived access token
//! and caches it in process memory, refreshing slightly before expiry.

use crate::config::SpApiConfig;
use crate::utils::error::{Result, TrackerError};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Cached access token with expiration
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Expired for our purposes once inside the safety margin
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// LWA authentication handler
#[derive(Debug, Clone)]
pub struct LwaAuth {
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_cache: Arc<RwLock<Option<AccessToken>>>,
    http_client: reqwest::Client,
}

impl LwaAuth {
    pub fn new(config: &SpApiConfig) -> Self {
        Self {
            token_url: config.lwa_url.clone(),
            client_id: config.lwa_client_id.clone(),
            client_secret: config.lwa_client_secret.clone(),
            refresh_token: config.lwa_refresh_token.clone(),
            token_cache: Arc::new(RwLock::new(None)),
            http_client: reqwest::Client::new(),
        }
    }

    /// Current access token, refreshed transparently when stale
    pub async fn access_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(token) = cache.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cache = self.token_cache.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cache.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let token = self.exchange_refresh_token().await?;
        let value = token.token.clone();
        *cache = Some(token);
        Ok(value)
    }

    async fn exchange_refresh_token(&self) -> Result<AccessToken> {
        debug!("refreshing LWA access token");
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &self.refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::SpApi(format!(
                "LWA token exchange failed with {}: {}",
                status, body
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        Ok(AccessToken {
            token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}
