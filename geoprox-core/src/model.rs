//! Domain model shared across the cache, store, and query layers.
//!
//! Wire shapes are camelCase JSON. `location` round-trips as a GeoJSON
//! `Point` with `[lng, lat]` coordinate order, matching how records are
//! persisted in the document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A geographic point. Internally `(lon, lat)`; serialized as GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// GeoJSON wire form of [`GeoPoint`].
#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    /// `[lng, lat]` per GeoJSON
    coordinates: [f64; 2],
}

impl Serialize for GeoPoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GeoJsonPoint {
            kind: "Point".to_string(),
            coordinates: [self.lon, self.lat],
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = GeoJsonPoint::deserialize(deserializer)?;
        if raw.kind != "Point" {
            return Err(serde::de::Error::custom(format!(
                "expected GeoJSON Point, got {}",
                raw.kind
            )));
        }
        Ok(GeoPoint {
            lon: raw.coordinates[0],
            lat: raw.coordinates[1],
        })
    }
}

/// A property record as the cache consumes it.
///
/// The cache treats the payload as opaque beyond these fields; extra
/// attributes on stored documents are preserved by the document store, not
/// here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub location: GeoPoint,
    pub date_added: DateTime<Utc>,
    pub price: f64,
    /// Locality grouping value (neighbourhood or city, dataset-dependent)
    pub category_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_identity_verified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_verified: bool,
}

impl Property {
    /// The scoring inputs this record contributes to a cached bucket.
    pub fn bucket_metadata(&self) -> BucketMetadata {
        BucketMetadata {
            date_added: self.date_added,
            is_premium: self.is_premium,
            is_featured: self.is_featured,
            is_verified: self.is_verified,
        }
    }
}

/// The inputs needed to recompute a bucket's temporal score on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketMetadata {
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_verified: bool,
}

impl BucketMetadata {
    /// Metadata for a list payload: scored from the write instant with no
    /// attribute boosts, so the bucket decays uniformly with elapsed time.
    pub fn from_write_time(now: DateTime<Utc>) -> Self {
        Self {
            date_added: now,
            is_premium: false,
            is_featured: false,
            is_verified: false,
        }
    }
}

/// The value stored under a geohash cache key.
///
/// `score` is the temporal score at write time; `metadata` lets the read
/// path recompute the current score for the degradation check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedBucket {
    pub data: JsonValue,
    pub score: f64,
    pub written_at: DateTime<Utc>,
    pub metadata: BucketMetadata,
}
