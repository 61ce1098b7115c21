//! Geohash-partitioned result cache for GeoProx.
//!
//! The cache stores query-result buckets under keys of the form
//! `geo:<geohash>:<radius>`, where the geohash precision is derived from
//! the query radius. Each bucket carries the temporal score it was written
//! with; reads recompute the score and evict buckets that have degraded
//! past the threshold. A KV-level sorted set (the score index) mirrors
//! every live key's current score for top-N retrieval and bulk eviction.
//!
//! # Modules
//!
//! - [`kv`]: the key/value store port (TTL writes, pattern scan, sorted sets)
//! - [`memory`]: in-memory reference backend for the port
//! - [`geo_cache`]: the geohash cache layer itself
//! - [`optimizer`]: per-cell hit-ratio tracking and TTL shortening
//! - [`reconcile`]: background score-index reconciliation
//! - [`error`]: error types

pub mod error;
pub mod geo_cache;
pub mod kv;
pub mod memory;
pub mod optimizer;
pub mod reconcile;

pub use error::{CacheError, Result};
pub use geo_cache::{GeoCache, Lookup, RefreshOutcome, SCORE_INDEX_KEY};
pub use kv::{KvStore, KvValueKind, ScoredMember};
pub use memory::MemoryKv;
pub use optimizer::HitRatioOptimizer;
pub use reconcile::spawn_reconciler;
