//! Relevance scoring: temporal decay combined with proximity, price, and
//! user-preference factors.
//!
//! Two proximity shapes are in play:
//!
//! - [`inverse_distance`] (`1 / (1 + d_km)`) orders results inside a single
//!   nearby-query page; it is what the query coordinator attaches to each
//!   returned item.
//! - [`proximity_decay`] (`exp(-d_km / 10)`) feeds the preference-aware
//!   [`relevance`] score used when a caller supplies ranking preferences.

use crate::geo::haversine_km;
use crate::model::Property;
use crate::score::temporal_score;
use chrono::{DateTime, Utc};

/// Optional user preferences that shape the relevance score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingPrefs {
    /// Items above this price are penalized proportionally.
    pub max_price: Option<f64>,
    /// Locality values (category keys) boosted by 1.2.
    pub preferred_locations: Vec<String>,
    /// Property types boosted by 1.1.
    pub preferred_types: Vec<String>,
}

impl RankingPrefs {
    /// True when no preference would alter the score.
    pub fn is_empty(&self) -> bool {
        self.max_price.is_none()
            && self.preferred_locations.is_empty()
            && self.preferred_types.is_empty()
    }
}

/// Exponential proximity decay with a 10 km scale.
pub fn proximity_decay(distance_km: f64) -> f64 {
    (-distance_km / 10.0).exp()
}

/// Inverse-distance weighting used for result ordering.
pub fn inverse_distance(temporal: f64, distance_km: f64) -> f64 {
    temporal / (1.0 + distance_km)
}

/// Full relevance score for a property.
///
/// Starts from the temporal score and multiplies in proximity decay (when
/// an origin is supplied), a price factor capped at 1, and preference
/// boosts.
pub fn relevance(
    property: &Property,
    origin: Option<(f64, f64)>,
    prefs: &RankingPrefs,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = temporal_score(&property.bucket_metadata(), now);

    if let Some((lat, lng)) = origin {
        let d = haversine_km(lat, lng, property.location.lat, property.location.lon);
        score *= proximity_decay(d);
    }

    if let Some(max_price) = prefs.max_price {
        if property.price > 0.0 {
            score *= (max_price / property.price).min(1.0);
        }
    }

    if prefs
        .preferred_locations
        .iter()
        .any(|l| l == &property.category_key)
    {
        score *= 1.2;
    }

    if let Some(pt) = &property.property_type {
        if prefs.preferred_types.iter().any(|t| t == pt) {
            score *= 1.1;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;
    use chrono::TimeZone;

    fn prop(price: f64, category: &str, ptype: Option<&str>) -> Property {
        Property {
            id: "p".into(),
            location: GeoPoint::new(-74.0, 40.7),
            date_added: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            price,
            category_key: category.into(),
            room_type: None,
            property_type: ptype.map(Into::into),
            cancellation_policy: None,
            host_identity_verified: None,
            purpose: None,
            is_premium: false,
            is_featured: false,
            is_verified: false,
        }
    }

    #[test]
    fn test_proximity_decay_shape() {
        assert!((proximity_decay(0.0) - 1.0).abs() < 1e-12);
        assert!((proximity_decay(10.0) - (-1.0_f64).exp()).abs() < 1e-12);
        assert!(proximity_decay(5.0) > proximity_decay(20.0));
    }

    #[test]
    fn test_inverse_distance_shape() {
        assert!((inverse_distance(1.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((inverse_distance(1.0, 1.0) - 0.5).abs() < 1e-12);
        assert!(inverse_distance(1.0, 2.0) > inverse_distance(1.0, 9.0));
    }

    #[test]
    fn test_price_factor_caps_at_one() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let cheap = prop(50.0, "x", None);
        let pricey = prop(200.0, "x", None);
        let prefs = RankingPrefs {
            max_price: Some(100.0),
            ..Default::default()
        };
        // Under budget: no boost beyond 1
        assert!(
            (relevance(&cheap, None, &prefs, now) - relevance(&cheap, None, &Default::default(), now))
                .abs()
                < 1e-12
        );
        // Over budget: halved
        let base = relevance(&pricey, None, &Default::default(), now);
        assert!((relevance(&pricey, None, &prefs, now) - base * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_preference_boosts() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let p = prop(80.0, "Manhattan", Some("Apartment"));
        let base = relevance(&p, None, &Default::default(), now);

        let prefs = RankingPrefs {
            max_price: None,
            preferred_locations: vec!["Manhattan".into()],
            preferred_types: vec!["Apartment".into()],
        };
        let boosted = relevance(&p, None, &prefs, now);
        assert!((boosted - base * 1.2 * 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_origin_applies_distance_decay() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let p = prop(80.0, "x", None);
        let at_origin = relevance(&p, Some((40.7, -74.0)), &Default::default(), now);
        let far = relevance(&p, Some((40.7, -73.0)), &Default::default(), now);
        assert!(at_origin > far);
    }
}
