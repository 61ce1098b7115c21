//! Core types and algorithms for GeoProx.
//!
//! This crate holds everything the cache and query layers share but that
//! carries no I/O of its own:
//!
//! - [`geo`]: geohash encoding, neighbor enumeration, haversine distance
//! - [`score`]: temporal-decay scoring, dynamic TTL, degradation checks
//! - [`rank`]: combined relevance scoring (temporal x distance x preferences)
//! - [`model`]: the domain model (`Property`, `CachedBucket`, ...)
//! - [`error`]: core error type
//!
//! All functions here are pure; anything time-dependent takes `now`
//! explicitly so callers (and tests) control the clock.

pub mod error;
pub mod geo;
pub mod model;
pub mod rank;
pub mod score;

pub use error::{Error, Result};
pub use model::{BucketMetadata, CachedBucket, GeoPoint, Property};
