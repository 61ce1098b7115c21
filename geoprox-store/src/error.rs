//! Error types for geoprox-store

use thiserror::Error;

/// Result type alias using our StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Document store error type
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend failure (connection, query execution)
    #[error("document store error: {0}")]
    Backend(String),

    /// Malformed query handed to the store
    #[error("invalid store query: {0}")]
    InvalidQuery(String),
}

impl StoreError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }

    /// Create an invalid query error
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        StoreError::InvalidQuery(msg.into())
    }
}
