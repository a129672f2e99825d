//! Error types for the table cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the table cache.
///
/// A missing key is not an error: lookups return `Option` instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid or missing construction arguments, or entry options that
    /// cannot be honoured (e.g. an absolute expiration in the past).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid per-call input such as an empty key
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client construction or table provisioning failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A point read, upsert or delete against the table failed
    #[error("Store operation failed: {0}")]
    Store(String),
}

impl CacheError {
    /// Returns true when retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Connection(_) | CacheError::Store(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Configuration(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Store(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the table cache.
pub type Result<T> = std::result::Result<T, CacheError>;
