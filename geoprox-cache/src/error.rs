//! Error types for geoprox-cache

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Cache-layer error type
#[derive(Error, Debug)]
pub enum CacheError {
    /// KV operation exceeded its deadline
    #[error("kv operation timed out after {0:?}")]
    KvTimeout(Duration),

    /// KV backend failure
    #[error("kv error: {0}")]
    Kv(String),

    /// Bucket (de)serialization failure
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error (coordinate validation, geohash)
    #[error(transparent)]
    Core(#[from] geoprox_core::Error),
}

impl CacheError {
    /// Create a KV backend error
    pub fn kv(msg: impl Into<String>) -> Self {
        CacheError::Kv(msg.into())
    }
}
