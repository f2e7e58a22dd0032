//! HTTP route modules

pub mod health;
pub mod jobs;

use actix_web::web;

/// Success envelope for API responses. Failures are rendered by the
/// error type's `ResponseError` impl instead.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data
    pub data: T,
}

impl<T> ApiResponse<T>
where
    T: serde::Serialize,
{
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Configure all application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    health::configure_routes(cfg);
    jobs::configure_routes(cfg);
}
