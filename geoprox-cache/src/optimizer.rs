//! Hit-ratio optimizer.
//!
//! Tracks per-cell hit/miss counters and, when a cell's window fills
//! (hits + misses >= 100), shortens the TTL of every key in cells whose
//! hit ratio fell below 0.3. Counters are process-local and reset each
//! window; they do not survive restart.
//!
//! Increments are lock-free atomics behind a read lock; the map write
//! lock is only taken to insert a new cell. No lock is held across the
//! TTL-shortening I/O.

use crate::error::Result;
use crate::kv::KvStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{info, warn};

/// Window size: counters evaluate and reset once hits + misses reach this.
pub const WINDOW: u32 = 100;

/// Cells below this hit ratio get their TTLs shortened.
pub const LOW_RATIO: f64 = 0.3;

/// TTL applied to keys of low-performing cells.
pub const SHORTENED_TTL: Duration = Duration::from_secs(1800);

#[derive(Default)]
struct CellCounters {
    hits: AtomicU32,
    misses: AtomicU32,
}

/// Per-cell hit/miss tracking with threshold-driven TTL adjustment.
pub struct HitRatioOptimizer {
    kv: Arc<dyn KvStore>,
    cells: RwLock<HashMap<String, Arc<CellCounters>>>,
    total_hits: AtomicU64,
    total_misses: AtomicU64,
}

impl HitRatioOptimizer {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            cells: RwLock::new(HashMap::new()),
            total_hits: AtomicU64::new(0),
            total_misses: AtomicU64::new(0),
        }
    }

    /// Record a cache hit for a cell.
    pub async fn record_hit(&self, cell: &str) {
        self.total_hits.fetch_add(1, Ordering::Relaxed);
        let counters = self.counters(cell);
        counters.hits.fetch_add(1, Ordering::Relaxed);
        self.maybe_close_window(cell, &counters).await;
    }

    /// Record a cache miss for a cell.
    pub async fn record_miss(&self, cell: &str) {
        self.total_misses.fetch_add(1, Ordering::Relaxed);
        let counters = self.counters(cell);
        counters.misses.fetch_add(1, Ordering::Relaxed);
        self.maybe_close_window(cell, &counters).await;
    }

    /// Lifetime hit count across all cells (feeds cache stats).
    pub fn total_hits(&self) -> u64 {
        self.total_hits.load(Ordering::Relaxed)
    }

    /// Lifetime miss count across all cells.
    pub fn total_misses(&self) -> u64 {
        self.total_misses.load(Ordering::Relaxed)
    }

    /// Current (hits, misses) window for a cell. Zeros if untracked.
    pub fn window_of(&self, cell: &str) -> (u32, u32) {
        let cells = self.cells.read().expect("optimizer lock poisoned");
        match cells.get(cell) {
            Some(c) => (
                c.hits.load(Ordering::Relaxed),
                c.misses.load(Ordering::Relaxed),
            ),
            None => (0, 0),
        }
    }

    fn counters(&self, cell: &str) -> Arc<CellCounters> {
        {
            let cells = self.cells.read().expect("optimizer lock poisoned");
            if let Some(c) = cells.get(cell) {
                return c.clone();
            }
        }
        let mut cells = self.cells.write().expect("optimizer lock poisoned");
        cells.entry(cell.to_string()).or_default().clone()
    }

    /// Evaluate and reset the window once it has filled.
    ///
    /// The atomic swap-to-zero makes exactly one caller own the full
    /// window; racing callers observe zeros and bail.
    async fn maybe_close_window(&self, cell: &str, counters: &CellCounters) {
        let hits = counters.hits.load(Ordering::Relaxed);
        let misses = counters.misses.load(Ordering::Relaxed);
        if hits + misses < WINDOW {
            return;
        }

        let hits = counters.hits.swap(0, Ordering::Relaxed);
        let misses = counters.misses.swap(0, Ordering::Relaxed);
        let total = hits + misses;
        if total < WINDOW {
            // Lost the race to another closer
            return;
        }

        let ratio = hits as f64 / total as f64;
        if ratio < LOW_RATIO {
            info!(cell, ratio, "low hit ratio, shortening cell TTLs");
            if let Err(e) = self.shorten_cell_ttls(cell).await {
                warn!(cell, error = %e, "TTL shortening failed");
            }
        }
    }

    async fn shorten_cell_ttls(&self, cell: &str) -> Result<()> {
        let keys = self.kv.scan(&format!("geo:{cell}:*")).await?;
        for key in &keys {
            self.kv.expire(key, SHORTENED_TTL).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for HitRatioOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HitRatioOptimizer")
            .field("total_hits", &self.total_hits())
            .field("total_misses", &self.total_misses())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKv;

    async fn drive(opt: &HitRatioOptimizer, cell: &str, hits: u32, misses: u32) {
        for _ in 0..hits {
            opt.record_hit(cell).await;
        }
        for _ in 0..misses {
            opt.record_miss(cell).await;
        }
    }

    #[tokio::test]
    async fn test_ratio_at_threshold_leaves_ttl_alone() {
        let kv = Arc::new(MemoryKv::new());
        kv.set_with_ttl("geo:abc12:5", b"{}", Duration::from_secs(7200))
            .await
            .unwrap();
        let opt = HitRatioOptimizer::new(kv.clone());

        // 30/70: ratio exactly 0.3, not below -> no adjustment
        drive(&opt, "abc12", 30, 70).await;

        let ttl = kv.ttl_of("geo:abc12:5").await.unwrap();
        assert!(ttl > Duration::from_secs(7000), "TTL was shortened: {ttl:?}");
        // Window still resets
        assert_eq!(opt.window_of("abc12"), (0, 0));
    }

    #[tokio::test]
    async fn test_low_ratio_shortens_all_cell_keys() {
        let kv = Arc::new(MemoryKv::new());
        kv.set_with_ttl("geo:abc12:5", b"{}", Duration::from_secs(7200))
            .await
            .unwrap();
        kv.set_with_ttl("geo:abc12:10", b"{}", Duration::from_secs(7200))
            .await
            .unwrap();
        // Different cell, must be untouched
        kv.set_with_ttl("geo:zzz99:5", b"{}", Duration::from_secs(7200))
            .await
            .unwrap();
        let opt = HitRatioOptimizer::new(kv.clone());

        // 20/80: ratio 0.2 -> shorten
        drive(&opt, "abc12", 20, 80).await;

        for key in ["geo:abc12:5", "geo:abc12:10"] {
            let ttl = kv.ttl_of(key).await.unwrap();
            assert!(
                ttl <= SHORTENED_TTL,
                "{key} TTL not shortened: {ttl:?}"
            );
        }
        let ttl = kv.ttl_of("geo:zzz99:5").await.unwrap();
        assert!(ttl > Duration::from_secs(7000));
        assert_eq!(opt.window_of("abc12"), (0, 0));
    }

    #[tokio::test]
    async fn test_window_not_closed_early() {
        let kv = Arc::new(MemoryKv::new());
        let opt = HitRatioOptimizer::new(kv);
        drive(&opt, "abc12", 10, 89).await;
        assert_eq!(opt.window_of("abc12"), (10, 89));
        // The 100th event closes the window
        opt.record_miss("abc12").await;
        assert_eq!(opt.window_of("abc12"), (0, 0));
    }

    #[tokio::test]
    async fn test_totals_accumulate_across_windows() {
        let kv = Arc::new(MemoryKv::new());
        let opt = HitRatioOptimizer::new(kv);
        drive(&opt, "abc12", 60, 60).await;
        assert_eq!(opt.total_hits(), 60);
        assert_eq!(opt.total_misses(), 60);
    }

    #[tokio::test]
    async fn test_cells_are_independent() {
        let kv = Arc::new(MemoryKv::new());
        let opt = HitRatioOptimizer::new(kv);
        drive(&opt, "aaa11", 5, 0).await;
        drive(&opt, "bbb22", 0, 7).await;
        assert_eq!(opt.window_of("aaa11"), (5, 0));
        assert_eq!(opt.window_of("bbb22"), (0, 7));
    }
}
