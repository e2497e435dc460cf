//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Primary cache failures
//! surface as [`CacheError`]; the persistence side channel has its own
//! [`PersistenceError`] that never reaches a command caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::persistence::SolverKind;

// == Cache Error Enum ==
/// Unified error type for the command surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A value could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A declared listener or recovery hook could not be bound
    #[error("Cannot bind {kind} '{name}'")]
    Binding { kind: &'static str, name: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Codec Error Enum ==
/// Raised when raw bytes cannot be turned back into domain objects.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("key is not valid UTF-8: {0}")]
    InvalidKey(#[from] std::string::FromUtf8Error),

    #[error("malformed value: {0}")]
    InvalidValue(#[from] serde_json::Error),
}

// == Persistence Error Enum ==
/// Failures on the persistence side channel.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// No solver registered for the requested kind
    #[error("no persistence solver registered for {0:?}")]
    SolverNotFound(SolverKind),

    /// The durable medium failed
    #[error("persistence I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot could not be (de)serialized
    #[error("persistence snapshot is malformed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The async persistence worker is gone
    #[error("persistence worker is not running")]
    WorkerClosed,
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Codec(_) => StatusCode::BAD_REQUEST,
            CacheError::Binding { .. } | CacheError::Config(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = CacheError::NotFound("k".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_codec_error_maps_to_400() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let response = CacheError::from(CodecError::from(err)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_binding_error_message() {
        let err = CacheError::Binding {
            kind: "expiration listener",
            name: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot bind expiration listener 'nope'");
    }
}
