//! The geohash cache layer.
//!
//! Cache keys have the shape `geo:<geohash>:<radius>`, with the geohash
//! precision chosen from the query radius:
//!
//! | radius        | precision | cell size |
//! |---------------|-----------|-----------|
//! | r <= 1 km     | 7         | ~150 m    |
//! | r <= 5 km     | 6         | ~1.2 km   |
//! | otherwise     | 5         | ~2.4 km   |
//!
//! Every `put` records the bucket's write-time score in the score index (a
//! KV sorted set); every `get` recomputes the score from the stored
//! metadata and evicts the bucket if it has degraded past the threshold.
//! The bucket write and the index write are not atomic; the reconciler
//! pass ([`GeoCache::refresh_scores`]) drops index entries whose key has
//! expired.
//!
//! All KV calls run under a short deadline (default 500 ms). Callers on
//! the query path treat read errors as cache misses.

use crate::error::{CacheError, Result};
use crate::kv::KvStore;
use chrono::{DateTime, Utc};
use geoprox_core::geo::{encode, neighbors, validate_coordinates};
use geoprox_core::model::{BucketMetadata, CachedBucket};
use geoprox_core::score::{dynamic_ttl, is_degraded, temporal_score};
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sorted-set key holding (cache key, current temporal score) pairs.
///
/// Deliberately outside the `geo:` namespace so pattern deletes and key
/// counts never touch it.
pub const SCORE_INDEX_KEY: &str = "zidx:geo:scores";

/// Default deadline for individual KV operations.
pub const DEFAULT_KV_DEADLINE: Duration = Duration::from_millis(500);

/// Result of a cache lookup.
#[derive(Debug)]
pub enum Lookup {
    /// Live bucket whose score is still within the degradation threshold.
    Hit(CachedBucket),
    /// Absent, expired, or evicted by the degradation check.
    Miss,
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

/// Outcome of a score-index refresh pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Index entries re-scored from live buckets.
    pub refreshed: u64,
    /// Dangling index entries removed.
    pub orphans_removed: u64,
}

/// Geohash-partitioned cache over a [`KvStore`].
pub struct GeoCache {
    kv: Arc<dyn KvStore>,
    kv_deadline: Duration,
}

impl GeoCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            kv_deadline: DEFAULT_KV_DEADLINE,
        }
    }

    pub fn with_deadline(kv: Arc<dyn KvStore>, kv_deadline: Duration) -> Self {
        Self { kv, kv_deadline }
    }

    /// Geohash precision for a query radius in km.
    pub fn precision_for(radius_km: f64) -> usize {
        if radius_km <= 1.0 {
            7
        } else if radius_km <= 5.0 {
            6
        } else {
            5
        }
    }

    /// Cache key for a query: `geo:<geohash>:<radius>`.
    pub fn key_for(lat: f64, lng: f64, radius_km: f64) -> geoprox_core::Result<String> {
        let cell = encode(lat, lng, Self::precision_for(radius_km))?;
        Ok(Self::key_for_cell(&cell, radius_km))
    }

    /// Cache key for an already-encoded cell (neighbor warming path).
    pub fn key_for_cell(cell: &str, radius_km: f64) -> String {
        format!("geo:{}:{}", cell, fmt_radius(radius_km))
    }

    /// The geohash cell embedded in a cache key, if the key is well-formed.
    pub fn cell_of(key: &str) -> Option<&str> {
        let rest = key.strip_prefix("geo:")?;
        let (cell, _radius) = rest.split_once(':')?;
        (!cell.is_empty()).then_some(cell)
    }

    /// Write a bucket and upsert its score-index entry.
    ///
    /// Returns the write-time score. The TTL is derived from the score.
    pub async fn put_at(
        &self,
        key: &str,
        data: JsonValue,
        metadata: BucketMetadata,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        let score = temporal_score(&metadata, now);
        let ttl = dynamic_ttl(score);
        let bucket = CachedBucket {
            data,
            score,
            written_at: now,
            metadata,
        };
        let bytes = serde_json::to_vec(&bucket)?;

        self.deadline(self.kv.set_with_ttl(key, &bytes, ttl)).await?;
        if let Err(e) = self.deadline(self.kv.zadd(SCORE_INDEX_KEY, key, score)).await {
            // Bucket landed but the index didn't; the reconciler will
            // converge, so don't fail the write.
            warn!(key, error = %e, "score index update failed");
        }
        debug!(key, score, ttl_secs = ttl.as_secs(), "cached bucket");
        Ok(score)
    }

    /// [`GeoCache::put_at`] with the current wall clock.
    pub async fn put(&self, key: &str, data: JsonValue, metadata: BucketMetadata) -> Result<f64> {
        self.put_at(key, data, metadata, Utc::now()).await
    }

    /// Look up a bucket, running the degradation check.
    ///
    /// A bucket whose recomputed score has fallen below the threshold is
    /// deleted (with its index entry) and reported as a miss.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Result<Lookup> {
        let Some(bytes) = self.deadline(self.kv.get(key)).await? else {
            return Ok(Lookup::Miss);
        };
        let bucket: CachedBucket = serde_json::from_slice(&bytes)?;

        if is_degraded(bucket.score, &bucket.metadata, now) {
            debug!(key, written_score = bucket.score, "evicting degraded bucket");
            self.evict(key).await;
            return Ok(Lookup::Miss);
        }
        Ok(Lookup::Hit(bucket))
    }

    /// [`GeoCache::get_at`] with the current wall clock.
    pub async fn get(&self, key: &str) -> Result<Lookup> {
        self.get_at(key, Utc::now()).await
    }

    /// Whether a live bucket exists under `key` (no degradation check).
    pub async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.deadline(self.kv.get(key)).await?.is_some())
    }

    /// Best-effort set-if-absent marker with a short TTL.
    ///
    /// Returns true if this caller placed the marker. The check-then-set
    /// pair is not atomic; concurrent warmers may both proceed, which the
    /// last-writer-wins cell contract tolerates.
    pub async fn try_mark(&self, key: &str, ttl: Duration) -> Result<bool> {
        if self.deadline(self.kv.get(key)).await?.is_some() {
            return Ok(false);
        }
        self.deadline(self.kv.set_with_ttl(key, b"1", ttl)).await?;
        Ok(true)
    }

    /// Invalidate every cached bucket in the cell covering `(lat, lng)`
    /// and its 8 neighbors, at the precision implied by `radius_km`.
    ///
    /// Matches by cell prefix (`geo:<cell>*`): geohash cells nest by
    /// prefix, so this also removes finer-precision buckets inside each
    /// affected cell, across all radii. Returns the number of keys
    /// removed.
    pub async fn invalidate_radius(&self, lat: f64, lng: f64, radius_km: f64) -> Result<u64> {
        validate_coordinates(lat, lng)?;
        let precision = Self::precision_for(radius_km);
        let center = encode(lat, lng, precision)?;
        let ring = neighbors(&center)?;

        let mut removed = 0u64;
        for cell in std::iter::once(center.as_str()).chain(ring.iter().map(String::as_str)) {
            let keys = self.deadline(self.kv.scan(&format!("geo:{cell}*"))).await?;
            if keys.is_empty() {
                continue;
            }
            removed += self.deadline(self.kv.del(&keys)).await?;
            if let Err(e) = self.deadline(self.kv.zrem(SCORE_INDEX_KEY, &keys)).await {
                warn!(cell, error = %e, "score index removal failed during invalidation");
            }
        }
        debug!(lat, lng, radius_km, removed, "radius invalidation");
        Ok(removed)
    }

    /// Payloads of the `limit` highest-scored live buckets, best first.
    ///
    /// Index entries whose bucket has expired are skipped (the reconciler
    /// removes them).
    pub async fn top_n(&self, limit: usize) -> Result<Vec<JsonValue>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ranked = self
            .deadline(self.kv.zrange(SCORE_INDEX_KEY, 0, limit as isize - 1, true))
            .await?;

        let mut out = Vec::with_capacity(ranked.len());
        for entry in ranked {
            if let Some(bytes) = self.deadline(self.kv.get(&entry.member)).await? {
                let bucket: CachedBucket = serde_json::from_slice(&bytes)?;
                out.push(bucket.data);
            }
        }
        Ok(out)
    }

    /// Delete every bucket whose indexed score is `<= threshold`.
    ///
    /// Returns the number of buckets removed.
    pub async fn cleanup_below(&self, threshold: f64) -> Result<u64> {
        let doomed = self
            .deadline(
                self.kv
                    .zrange_by_score(SCORE_INDEX_KEY, f64::NEG_INFINITY, threshold),
            )
            .await?;
        if doomed.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = doomed.into_iter().map(|m| m.member).collect();
        let removed = self.deadline(self.kv.del(&keys)).await?;
        self.deadline(
            self.kv
                .zrem_range_by_score(SCORE_INDEX_KEY, f64::NEG_INFINITY, threshold),
        )
        .await?;
        debug!(threshold, removed, "low-score cleanup");
        Ok(removed)
    }

    /// Re-score every index entry from its live bucket; drop orphans.
    pub async fn refresh_scores_at(&self, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let entries = self
            .deadline(self.kv.zrange(SCORE_INDEX_KEY, 0, -1, false))
            .await?;

        let mut outcome = RefreshOutcome::default();
        for entry in entries {
            match self.deadline(self.kv.get(&entry.member)).await? {
                Some(bytes) => {
                    let bucket: CachedBucket = serde_json::from_slice(&bytes)?;
                    let score = temporal_score(&bucket.metadata, now);
                    self.deadline(self.kv.zadd(SCORE_INDEX_KEY, &entry.member, score))
                        .await?;
                    outcome.refreshed += 1;
                }
                None => {
                    self.deadline(self.kv.zrem(SCORE_INDEX_KEY, &[entry.member.clone()]))
                        .await?;
                    outcome.orphans_removed += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// [`GeoCache::refresh_scores_at`] with the current wall clock.
    pub async fn refresh_scores(&self) -> Result<RefreshOutcome> {
        self.refresh_scores_at(Utc::now()).await
    }

    /// Number of live `geo:*` keys.
    pub async fn key_count(&self) -> Result<u64> {
        Ok(self.deadline(self.kv.scan("geo:*")).await?.len() as u64)
    }

    /// Total serialized size of live `geo:*` values, in bytes.
    pub async fn data_bytes(&self) -> Result<u64> {
        let keys = self.deadline(self.kv.scan("geo:*")).await?;
        let mut total = 0u64;
        for key in keys {
            if let Some(bytes) = self.deadline(self.kv.get(&key)).await? {
                total += bytes.len() as u64;
            }
        }
        Ok(total)
    }

    /// Drop the entire cache, score index included.
    pub async fn clear(&self) -> Result<()> {
        self.deadline(self.kv.flush_all()).await
    }

    /// Delete a bucket and its index entry, ignoring failures.
    async fn evict(&self, key: &str) {
        if let Err(e) = self.deadline(self.kv.del(&[key.to_string()])).await {
            warn!(key, error = %e, "bucket eviction failed");
        }
        if let Err(e) = self
            .deadline(self.kv.zrem(SCORE_INDEX_KEY, &[key.to_string()]))
            .await
        {
            warn!(key, error = %e, "score index eviction failed");
        }
    }

    async fn deadline<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.kv_deadline, fut).await {
            Ok(res) => res,
            Err(_) => Err(CacheError::KvTimeout(self.kv_deadline)),
        }
    }
}

impl std::fmt::Debug for GeoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoCache")
            .field("kv_deadline", &self.kv_deadline)
            .finish_non_exhaustive()
    }
}

/// Radius display used inside cache keys: integral radii render without a
/// trailing `.0` so `geo:dr5ru7:2` and `geo:dr5ru7:2.5` coexist cleanly.
fn fmt_radius(radius_km: f64) -> String {
    if radius_km.fract() == 0.0 {
        format!("{}", radius_km as i64)
    } else {
        format!("{radius_km}")
    }
}
