//! Query coordination for GeoProx.
//!
//! [`GeoProx`] ties the pieces together: the geohash cache, the hit-ratio
//! optimizer, and the document store port. It owns the end-to-end nearby
//! query (cache lookup, miss handling, scoring, neighbor warming), the
//! property write path with radius invalidation, the aggregation service,
//! and the legacy coordinate-range path.
//!
//! The HTTP layer in `geoprox-server` is a thin adapter over this crate.

pub mod aggregate;
pub mod error;
pub mod nearby;
pub mod properties;

pub use error::{ApiError, Result};
pub use nearby::{NearbyPage, NearbyQuery, QueryMetadata, ScoredProperty};
pub use properties::{CacheStats, CreateProperty, PropertyPage};

use geoprox_cache::{GeoCache, HitRatioOptimizer, KvStore};
use geoprox_store::PropertyStore;
use std::sync::Arc;
use std::time::Duration;

/// Default query radius in km when the client omits one.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Default page size for nearby queries and listings.
pub const DEFAULT_LIMIT: usize = 10;

/// Upper bound on a requested page size.
pub const MAX_LIMIT: usize = 1000;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for document store operations.
    pub store_deadline: Duration,
    /// Deadline for individual KV operations.
    pub kv_deadline: Duration,
    /// Max items fetched per neighbor cell during warming.
    pub warm_limit: usize,
    /// TTL of the per-cell in-flight warming marker.
    pub warm_marker_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_deadline: Duration::from_secs(5),
            kv_deadline: Duration::from_millis(500),
            warm_limit: 10,
            warm_marker_ttl: Duration::from_secs(2),
        }
    }
}

/// The GeoProx engine: geohash cache + optimizer in front of a document
/// store.
pub struct GeoProx {
    cache: Arc<GeoCache>,
    optimizer: Arc<HitRatioOptimizer>,
    store: Arc<dyn PropertyStore>,
    config: EngineConfig,
}

impl GeoProx {
    pub fn new(kv: Arc<dyn KvStore>, store: Arc<dyn PropertyStore>, config: EngineConfig) -> Self {
        let cache = Arc::new(GeoCache::with_deadline(kv.clone(), config.kv_deadline));
        let optimizer = Arc::new(HitRatioOptimizer::new(kv));
        Self {
            cache,
            optimizer,
            store,
            config,
        }
    }

    /// The geohash cache layer (reconciler setup, diagnostics).
    pub fn cache(&self) -> &Arc<GeoCache> {
        &self.cache
    }

    /// The hit-ratio optimizer.
    pub fn optimizer(&self) -> &Arc<HitRatioOptimizer> {
        &self.optimizer
    }

    /// The backing document store.
    pub fn store(&self) -> &Arc<dyn PropertyStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate pagination bounds shared by every paged operation.
    pub(crate) fn validate_pagination(&self, page: usize, limit: usize) -> Result<()> {
        if page < 1 {
            return Err(ApiError::InvalidPagination("page must be >= 1".into()));
        }
        if limit < 1 || limit > MAX_LIMIT {
            return Err(ApiError::InvalidPagination(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Run a store future under the configured deadline.
    pub(crate) async fn store_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = geoprox_store::Result<T>>,
    ) -> Result<T> {
        store_deadline(self.config.store_deadline, fut).await
    }
}

impl std::fmt::Debug for GeoProx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoProx")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Free-function form of the store deadline, shared with warming tasks.
pub(crate) async fn store_deadline<T>(
    deadline: Duration,
    fut: impl std::future::Future<Output = geoprox_store::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(res) => res.map_err(ApiError::from),
        Err(_) => Err(ApiError::StoreTimeout(deadline)),
    }
}
