//! API-level error types with the propagation policy baked in.
//!
//! Validation problems are their own variants so the HTTP layer can map
//! them to 4xx. KV problems never appear here from the query path (reads
//! degrade to misses, writes log and continue); they only surface from
//! cache-administration operations.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error type for engine operations
#[derive(Error, Debug)]
pub enum ApiError {
    /// Latitude or longitude outside valid bounds
    #[error("invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// Page or limit outside valid bounds
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Too many requests from one client
    #[error("rate limit exceeded")]
    RateLimited,

    /// Document store exceeded its deadline
    #[error("document store timed out after {0:?}")]
    StoreTimeout(Duration),

    /// Document store failure
    #[error(transparent)]
    Store(#[from] geoprox_store::StoreError),

    /// Cache failure (administration paths only)
    #[error(transparent)]
    Cache(#[from] geoprox_cache::CacheError),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}

impl From<geoprox_core::Error> for ApiError {
    fn from(e: geoprox_core::Error) -> Self {
        match e {
            geoprox_core::Error::InvalidCoordinate { lat, lng } => {
                ApiError::InvalidCoordinate { lat, lng }
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(format!("payload serialization: {e}"))
    }
}
