//! Configuration model structs
//!
//! Each section of the tracker configuration lives in its own struct with
//! serde defaults so partial YAML files and env-only deployments both work.

use serde::{Deserialize, Serialize};

/// Top-level tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Progress store (Redis) configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Amazon SP-API credentials and endpoints
    #[serde(default)]
    pub spapi: SpApiConfig,
    /// Batch job tuning
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Progress store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

/// Amazon SP-API configuration
///
/// Two credential pairs are involved: the LWA (Login with Amazon) refresh
/// credentials used to obtain short-lived access tokens, and the AWS
/// access/secret pair used for SigV4 request signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpApiConfig {
    /// LWA client id
    #[serde(default)]
    pub lwa_client_id: String,
    /// LWA client secret
    #[serde(default)]
    pub lwa_client_secret: String,
    /// LWA long-lived refresh token
    #[serde(default)]
    pub lwa_refresh_token: String,
    /// LWA token endpoint
    #[serde(default = "default_lwa_url")]
    pub lwa_url: String,
    /// AWS access key id for SigV4
    #[serde(default)]
    pub aws_access_key: String,
    /// AWS secret access key for SigV4
    #[serde(default)]
    pub aws_secret_key: String,
    /// AWS region of the SP-API endpoint
    #[serde(default = "default_region")]
    pub region: String,
    /// SP-API endpoint base URL
    #[serde(default = "default_spapi_endpoint")]
    pub endpoint: String,
    /// Marketplace to query restrictions for
    #[serde(default = "default_marketplace_id")]
    pub marketplace_id: String,
    /// Seller id the restrictions apply to
    #[serde(default)]
    pub seller_id: String,
    /// Maximum attempts per lookup (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds, doubled per retry
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for SpApiConfig {
    fn default() -> Self {
        Self {
            lwa_client_id: String::new(),
            lwa_client_secret: String::new(),
            lwa_refresh_token: String::new(),
            lwa_url: default_lwa_url(),
            aws_access_key: String::new(),
            aws_secret_key: String::new(),
            region: default_region(),
            endpoint: default_spapi_endpoint(),
            marketplace_id: default_marketplace_id(),
            seller_id: String::new(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// Batch job tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Concurrent lookups per chunk in the eligibility pipeline
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pause between dispatched chunks, in milliseconds
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
    /// Rows per upsert batch in the import pipeline
    #[serde(default = "default_import_batch_size")]
    pub import_batch_size: usize,
    /// Maximum row errors embedded in the import summary
    #[serde(default = "default_max_surfaced_errors")]
    pub max_surfaced_errors: usize,
    /// TTL of job progress records, in seconds
    #[serde(default = "default_progress_ttl_secs")]
    pub progress_ttl_secs: u64,
    /// TTL of the active-slot pointer while a job runs, in seconds
    #[serde(default = "default_slot_ttl_secs")]
    pub slot_ttl_secs: u64,
    /// Short TTL the slot is re-armed with after completion, in seconds
    #[serde(default = "default_slot_rearm_secs")]
    pub slot_rearm_secs: u64,
    /// TTL of cancellation flags, in seconds
    #[serde(default = "default_cancel_ttl_secs")]
    pub cancel_ttl_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            chunk_delay_ms: default_chunk_delay_ms(),
            import_batch_size: default_import_batch_size(),
            max_surfaced_errors: default_max_surfaced_errors(),
            progress_ttl_secs: default_progress_ttl_secs(),
            slot_ttl_secs: default_slot_ttl_secs(),
            slot_rearm_secs: default_slot_rearm_secs(),
            cancel_ttl_secs: default_cancel_ttl_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_lwa_url() -> String {
    "https://api.amazon.com/auth/o2/token".to_string()
}

fn default_region() -> String {
    "eu-west-1".to_string()
}

fn default_spapi_endpoint() -> String {
    "https://sellingpartnerapi-eu.amazon.com".to_string()
}

fn default_marketplace_id() -> String {
    // Amazon.de
    "A1PA6795UKMFR9".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    5
}

fn default_chunk_delay_ms() -> u64 {
    1000
}

fn default_import_batch_size() -> usize {
    50
}

fn default_max_surfaced_errors() -> usize {
    50
}

fn default_progress_ttl_secs() -> u64 {
    3600
}

fn default_slot_ttl_secs() -> u64 {
    3600
}

fn default_slot_rearm_secs() -> u64 {
    15
}

fn default_cancel_ttl_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: TrackerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.jobs.concurrency, 5);
        assert_eq!(config.jobs.import_batch_size, 50);
        assert_eq!(config.spapi.max_attempts, 3);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
server:
  port: 9000
jobs:
  concurrency: 2
  chunk_delay_ms: 0
"#;
        let config: TrackerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.jobs.concurrency, 2);
        assert_eq!(config.jobs.chunk_delay_ms, 0);
        // Untouched sections keep their defaults
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
    }
}
