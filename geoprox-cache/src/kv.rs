//! Key/value store port.
//!
//! The cache layer talks to its backing store exclusively through
//! [`KvStore`]. The trait mirrors the subset of a Redis-style surface the
//! cache needs: TTL'd string values, pattern scans, per-key expiry, and
//! sorted-set operations for the score index.
//!
//! Implementations must be safe to share across request handlers
//! (`Send + Sync`); the in-process reference implementation lives in
//! [`crate::memory`].

use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Kind of value stored under a key, for `key_type` introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvValueKind {
    /// Plain byte-string value
    String,
    /// Sorted set
    SortedSet,
}

/// A sorted-set member paired with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

/// Key/value store operations the cache layer depends on.
///
/// All write operations are atomic per key; nothing here spans keys
/// transactionally. Deleting a missing key is not an error.
#[async_trait]
pub trait KvStore: Debug + Send + Sync {
    /// Fetch the value stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key` with the given time-to-live.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Delete keys; returns how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// All live keys matching a glob pattern (`*` and `?` wildcards).
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Kind of value under `key`, or `None` if absent.
    async fn key_type(&self, key: &str) -> Result<Option<KvValueKind>>;

    /// Reset the TTL of an existing key; returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Insert or update a sorted-set member with the given score.
    async fn zadd(&self, set: &str, member: &str, score: f64) -> Result<()>;

    /// Members in rank order (ascending score, ties by member).
    ///
    /// `start`/`stop` are inclusive indices with Redis semantics (negative
    /// values count from the end). `reverse` flips to descending order.
    async fn zrange(
        &self,
        set: &str,
        start: isize,
        stop: isize,
        reverse: bool,
    ) -> Result<Vec<ScoredMember>>;

    /// Members with `min <= score <= max`, ascending.
    async fn zrange_by_score(&self, set: &str, min: f64, max: f64) -> Result<Vec<ScoredMember>>;

    /// Remove members from a sorted set; returns how many were present.
    async fn zrem(&self, set: &str, members: &[String]) -> Result<u64>;

    /// Remove all members with `min <= score <= max`; returns the count.
    async fn zrem_range_by_score(&self, set: &str, min: f64, max: f64) -> Result<u64>;

    /// Drop every key and sorted set.
    async fn flush_all(&self) -> Result<()>;
}
