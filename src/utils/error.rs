//! Error handling for the tracker
//!
//! This module defines all error types used throughout the crate.

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Result type alias for the tracker
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Main error type for the tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Progress store (Redis) errors
    #[error("Progress store error: {0}")]
    Redis(#[from] redis::RedisError),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record store errors
    #[error("Repository error: {0}")]
    Repository(String),

    /// SP-API lookup errors (retries exhausted or definitive failure)
    #[error("SP-API error: {0}")]
    SpApi(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrency conflict errors (a job of this kind is already active)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for TrackerError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            TrackerError::Validation(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                self.to_string(),
            ),
            TrackerError::BadRequest(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                self.to_string(),
            ),
            TrackerError::Csv(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "CSV_ERROR",
                self.to_string(),
            ),
            TrackerError::NotFound(_) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                self.to_string(),
            ),
            TrackerError::Conflict(_) => (
                actix_web::http::StatusCode::CONFLICT,
                "CONFLICT",
                self.to_string(),
            ),
            TrackerError::RateLimit(_) => (
                actix_web::http::StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                self.to_string(),
            ),
            TrackerError::Redis(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "PROGRESS_STORE_ERROR",
                "Progress store operation failed".to_string(),
            ),
            TrackerError::SpApi(_) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "SPAPI_ERROR",
                self.to_string(),
            ),
            TrackerError::HttpClient(_) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "Upstream request failed".to_string(),
            ),
            _ => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: error_code.to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
            },
        };

        HttpResponse::build(status_code).json(error_response)
    }
}

/// Standard error response format
#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_409() {
        let err = TrackerError::Conflict("seller-status check already running".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), actix_web::http::StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = TrackerError::NotFound("job abc".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let err = TrackerError::Validation("empty file".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_display_includes_cause() {
        let err = TrackerError::SpApi("retries exhausted".to_string());
        assert_eq!(err.to_string(), "SP-API error: retries exhausted");
    }
}
