//! Temporal-decay scoring and dynamic TTL.
//!
//! A record's temporal score combines exponential age decay, a stepped
//! time weight, and multiplicative attribute boosts:
//!
//! ```text
//! age_days    = clamp((now - date_added) / day, 0, 90)
//! base        = exp(-0.1 * age_days)
//! time_weight = 1.0 (age <= 7d) | 0.8 (age <= 30d) | 0.6 (older)
//! boost       = 1.2^premium * 1.1^featured * 1.05^verified
//! score       = base * time_weight * boost
//! ```
//!
//! The score drives two things: the TTL a bucket is written with, and the
//! degradation check that evicts buckets whose recomputed score has fallen
//! below 70% of the score they were written with.
//!
//! Every function takes `now` explicitly; nothing here reads the clock.

use crate::model::BucketMetadata;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Base TTL for cached buckets (1 hour).
pub const BASE_TTL: Duration = Duration::from_secs(3600);

/// Lower TTL bound: 0.5 x base.
pub const MIN_TTL: Duration = Duration::from_secs(1800);

/// Upper TTL bound: 2 x base.
pub const MAX_TTL: Duration = Duration::from_secs(7200);

/// Exponential decay rate per day of age.
const DECAY_PER_DAY: f64 = 0.1;

/// Age contribution saturates at 90 days.
const MAX_AGE_DAYS: f64 = 90.0;

/// A bucket is stale once its current score falls below this fraction of
/// the score it was written with.
pub const DEGRADATION_THRESHOLD: f64 = 0.7;

/// Compute the temporal score for a record at `now`.
///
/// Result lies in (0, ~1.386]; the upper end needs all three badges on a
/// fresh record.
pub fn temporal_score(metadata: &BucketMetadata, now: DateTime<Utc>) -> f64 {
    let age_secs = (now - metadata.date_added).num_seconds().max(0) as f64;
    let age_days = (age_secs / 86_400.0).clamp(0.0, MAX_AGE_DAYS);

    let base = (-DECAY_PER_DAY * age_days).exp();
    let time_weight = if age_days <= 7.0 {
        1.0
    } else if age_days <= 30.0 {
        0.8
    } else {
        0.6
    };

    let mut boost = 1.0;
    if metadata.is_premium {
        boost *= 1.2;
    }
    if metadata.is_featured {
        boost *= 1.1;
    }
    if metadata.is_verified {
        boost *= 1.05;
    }

    base * time_weight * boost
}

/// TTL for a bucket written with the given score.
///
/// Linear in the score clamped to [0, 1], so the result always lies in
/// `[MIN_TTL, MAX_TTL]`. Fractional seconds are floored.
pub fn dynamic_ttl(score: f64) -> Duration {
    let min = MIN_TTL.as_secs() as f64;
    let max = MAX_TTL.as_secs() as f64;
    let secs = (min + (max - min) * score.clamp(0.0, 1.0)).floor();
    Duration::from_secs(secs as u64)
}

/// Degradation check: has the bucket's score decayed past the threshold?
///
/// `written_score` is the score recorded at write time; the current score
/// is recomputed from the stored metadata.
pub fn is_degraded(written_score: f64, metadata: &BucketMetadata, now: DateTime<Utc>) -> bool {
    temporal_score(metadata, now) < DEGRADATION_THRESHOLD * written_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(date_added: DateTime<Utc>) -> BucketMetadata {
        BucketMetadata {
            date_added,
            is_premium: false,
            is_featured: false,
            is_verified: false,
        }
    }

    fn at(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(days)
    }

    #[test]
    fn test_fresh_record_scores_one() {
        let now = at(0);
        let score = temporal_score(&meta(now), now);
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_boosts_multiply() {
        let now = at(0);
        let m = BucketMetadata {
            date_added: now,
            is_premium: true,
            is_featured: true,
            is_verified: true,
        };
        let score = temporal_score(&m, now);
        assert!((score - 1.2 * 1.1 * 1.05).abs() < 1e-12);
    }

    #[test]
    fn test_time_weight_steps() {
        let m = meta(at(0));
        // 5 days: full weight
        let s5 = temporal_score(&m, at(5));
        assert!((s5 - (-0.5_f64).exp()).abs() < 1e-9);
        // 10 days: 0.8 weight
        let s10 = temporal_score(&m, at(10));
        assert!((s10 - 0.8 * (-1.0_f64).exp()).abs() < 1e-9);
        // 40 days: 0.6 weight
        let s40 = temporal_score(&m, at(40));
        assert!((s40 - 0.6 * (-4.0_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_age_clamps_at_90_days() {
        let m = meta(at(0));
        assert_eq!(temporal_score(&m, at(90)), temporal_score(&m, at(400)));
    }

    #[test]
    fn test_newer_records_never_score_lower() {
        // Monotonic decay: for a fixed observation time, a newer dateAdded
        // scores at least as high as an older one.
        let now = at(100);
        let mut prev = f64::NEG_INFINITY;
        for days_old in (0..=120).rev() {
            let s = temporal_score(&meta(now - chrono::Duration::days(days_old)), now);
            assert!(
                s >= prev,
                "score regressed at age {days_old}d: {s} < {prev}"
            );
            prev = s;
        }
    }

    #[test]
    fn test_ttl_bounds() {
        for score in [-1.0, 0.0, 0.25, 0.5, 0.99, 1.0, 1.386] {
            let ttl = dynamic_ttl(score);
            assert!(ttl >= MIN_TTL, "ttl below floor for score {score}");
            assert!(ttl <= MAX_TTL, "ttl above ceiling for score {score}");
        }
        assert_eq!(dynamic_ttl(0.0), MIN_TTL);
        assert_eq!(dynamic_ttl(1.0), MAX_TTL);
        assert_eq!(dynamic_ttl(0.5), Duration::from_secs(4500));
    }

    #[test]
    fn test_degradation_after_30_days() {
        let written_at = at(0);
        let m = meta(written_at);
        let written = temporal_score(&m, written_at);

        assert!(!is_degraded(written, &m, written_at));
        // Uniform decay crosses 0.7x within a few days
        assert!(is_degraded(written, &m, at(30)));
    }

    #[test]
    fn test_degradation_threshold_edges() {
        let written_at = at(0);
        let m = meta(written_at);
        // exp(-0.1 * age) < 0.7 first happens past ~3.57 days
        assert!(!is_degraded(1.0, &m, at(3)));
        assert!(is_degraded(1.0, &m, at(4)));
    }
}
