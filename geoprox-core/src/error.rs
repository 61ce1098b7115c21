//! Error types for geoprox-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Coordinate outside [-90, 90] latitude / [-180, 180] longitude
    #[error("invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// Geohash string is empty or contains non-base32 characters
    #[error("invalid geohash: {0}")]
    InvalidGeohash(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid coordinate error
    pub fn invalid_coordinate(lat: f64, lng: f64) -> Self {
        Error::InvalidCoordinate { lat, lng }
    }

    /// Create an invalid geohash error
    pub fn invalid_geohash(msg: impl Into<String>) -> Self {
        Error::InvalidGeohash(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}
