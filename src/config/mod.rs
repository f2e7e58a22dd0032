//! Configuration management for the tracker
//!
//! This module handles loading and validation of all tracker configuration.

pub mod models;

pub use models::*;

use crate::utils::error::{Result, TrackerError};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the tracker
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Tracker configuration
    pub tracker: TrackerConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TrackerError::Config(format!("Failed to read config file: {}", e)))?;

        let tracker: TrackerConfig = serde_yaml::from_str(&content)
            .map_err(|e| TrackerError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self { tracker };
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut tracker = TrackerConfig::default();

        if let Ok(host) = std::env::var("TRACKER_HOST") {
            tracker.server.host = host;
        }
        if let Ok(port) = std::env::var("TRACKER_PORT") {
            tracker.server.port = port
                .parse()
                .map_err(|_| TrackerError::Config(format!("Invalid TRACKER_PORT: {}", port)))?;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            tracker.redis.url = url;
        }
        if let Ok(v) = std::env::var("SPAPI_LWA_CLIENT_ID") {
            tracker.spapi.lwa_client_id = v;
        }
        if let Ok(v) = std::env::var("SPAPI_LWA_CLIENT_SECRET") {
            tracker.spapi.lwa_client_secret = v;
        }
        if let Ok(v) = std::env::var("SPAPI_LWA_REFRESH_TOKEN") {
            tracker.spapi.lwa_refresh_token = v;
        }
        if let Ok(v) = std::env::var("SPAPI_AWS_ACCESS_KEY") {
            tracker.spapi.aws_access_key = v;
        }
        if let Ok(v) = std::env::var("SPAPI_AWS_SECRET_KEY") {
            tracker.spapi.aws_secret_key = v;
        }
        if let Ok(v) = std::env::var("SPAPI_REGION") {
            tracker.spapi.region = v;
        }
        if let Ok(v) = std::env::var("SPAPI_ENDPOINT") {
            tracker.spapi.endpoint = v;
        }
        if let Ok(v) = std::env::var("SPAPI_MARKETPLACE_ID") {
            tracker.spapi.marketplace_id = v;
        }
        if let Ok(v) = std::env::var("SPAPI_SELLER_ID") {
            tracker.spapi.seller_id = v;
        }

        let config = Self { tracker };
        config.validate()?;
        Ok(config)
    }

    /// Get server configuration
    pub fn server(&self) -> &ServerConfig {
        &self.tracker.server
    }

    /// Get progress store configuration
    pub fn redis(&self) -> &RedisConfig {
        &self.tracker.redis
    }

    /// Get SP-API configuration
    pub fn spapi(&self) -> &SpApiConfig {
        &self.tracker.spapi
    }

    /// Get job tuning configuration
    pub fn jobs(&self) -> &JobsConfig {
        &self.tracker.jobs
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        if self.tracker.server.port == 0 {
            return Err(TrackerError::Config("Server port must not be 0".to_string()));
        }
        if self.tracker.redis.url.is_empty() {
            return Err(TrackerError::Config("Redis URL must not be empty".to_string()));
        }
        if self.tracker.jobs.concurrency == 0 {
            return Err(TrackerError::Config(
                "jobs.concurrency must be at least 1".to_string(),
            ));
        }
        if self.tracker.jobs.import_batch_size == 0 {
            return Err(TrackerError::Config(
                "jobs.import_batch_size must be at least 1".to_string(),
            ));
        }
        if self.tracker.spapi.max_attempts == 0 {
            return Err(TrackerError::Config(
                "spapi.max_attempts must be at least 1".to_string(),
            ));
        }

        debug!("Configuration validation completed");
        Ok(())
    }
}
