//! Background score-index reconciliation.
//!
//! Bucket and index writes are not atomic, so a bucket can expire while
//! its index entry lingers. This task periodically re-scores live entries
//! and drops dangling ones.

use crate::geo_cache::GeoCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Spawn the periodic score-index reconciler.
///
/// Runs until aborted; call `.abort()` on the returned handle at shutdown.
pub fn spawn_reconciler(cache: Arc<GeoCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so startup isn't a scan
        interval.tick().await;

        loop {
            interval.tick().await;
            match cache.refresh_scores().await {
                Ok(outcome) => {
                    if outcome.orphans_removed > 0 {
                        debug!(
                            refreshed = outcome.refreshed,
                            orphans_removed = outcome.orphans_removed,
                            "score index reconciled"
                        );
                    }
                }
                Err(e) => warn!(error = %e, "score index reconciliation failed"),
            }
        }
    })
}
