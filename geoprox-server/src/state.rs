//! Application state shared across request handlers.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::RateLimiter;
use geoprox_api::GeoProx;
use geoprox_cache::{KvStore, MemoryKv};
use geoprox_store::{MemoryPropertyStore, PropertyStore};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application state shared across all request handlers.
///
/// Shared as `Arc<AppState>` via axum's `State` extractor.
pub struct AppState {
    /// The query engine (cache + optimizer + store)
    pub engine: GeoProx,

    /// Server configuration
    pub config: ServerConfig,

    /// Per-client request rate limiter
    pub rate_limiter: RateLimiter,

    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// State over the in-memory reference backends.
    ///
    /// Production deployments wire their own [`KvStore`] and
    /// [`PropertyStore`] implementations through
    /// [`AppState::with_backends`].
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_backends(
            config,
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryPropertyStore::new()),
        )
    }

    /// State over caller-supplied backends.
    pub fn with_backends(
        config: ServerConfig,
        kv: Arc<dyn KvStore>,
        store: Arc<dyn PropertyStore>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::BadRequest)?;

        let engine = GeoProx::new(kv, store, config.engine_config());
        let rate_limiter =
            RateLimiter::new(config.rate_limit_per_min, Duration::from_secs(60));

        Ok(Self {
            engine,
            config,
            rate_limiter,
            start_time: Instant::now(),
        })
    }

    /// Get server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
