//! Property CRUD, the legacy coordinate-range path, and cache statistics.

use crate::error::{ApiError, Result};
use crate::nearby::{
    sort_by_relevance, NearbyPage, NearbyQuery, QueryMetadata, ScoredProperty,
};
use crate::GeoProx;
use chrono::{DateTime, Utc};
use geoprox_core::geo::{haversine_km, validate_coordinates};
use geoprox_core::model::{GeoPoint, Property};
use geoprox_core::rank::inverse_distance;
use geoprox_core::score::temporal_score;
use geoprox_store::BoundingBox;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Radius of the invalidation ring applied after a write, in km.
pub const INVALIDATION_RADIUS_KM: f64 = 10.0;

/// Rectangular pre-filter constant for the legacy range path: degrees per
/// km of radius. Only accurate near the equator; the geo-near path is
/// authoritative.
const DEGREES_PER_KM: f64 = 0.009;

/// Request body for creating a property.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProperty {
    #[serde(default)]
    pub id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category_key: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub cancellation_policy: Option<String>,
    #[serde(default)]
    pub host_identity_verified: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_verified: bool,
}

/// One page of an unfiltered listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPage {
    pub properties: Vec<Property>,
    pub total_pages: u64,
    pub current_page: u64,
}

/// Cache statistics report.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub cache_hits: u64,
    pub total_data_cached: u64,
    pub total_keys: u64,
    pub total_documents: u64,
}

impl GeoProx {
    /// Persist a property, then invalidate the surrounding cache cells.
    ///
    /// The write is durable once the store accepts it; invalidation
    /// failures are logged, never surfaced (TTL cleans up eventually).
    pub async fn add_property(&self, req: CreateProperty) -> Result<Property> {
        validate_coordinates(req.latitude, req.longitude)?;
        let now = Utc::now();

        let id = match req.id {
            Some(id) if !id.is_empty() => id,
            _ => generated_id(&req, now),
        };
        let property = Property {
            id,
            location: GeoPoint::new(req.longitude, req.latitude),
            date_added: req.date_added.unwrap_or(now),
            price: req.price,
            category_key: req.category_key.unwrap_or_default(),
            room_type: req.room_type,
            property_type: req.property_type,
            cancellation_policy: req.cancellation_policy,
            host_identity_verified: req.host_identity_verified,
            purpose: req.purpose,
            is_premium: req.is_premium,
            is_featured: req.is_featured,
            is_verified: req.is_verified,
        };

        let stored = self.store_deadline(self.store().insert(property)).await?;

        if let Err(e) = self
            .cache()
            .invalidate_radius(req.latitude, req.longitude, INVALIDATION_RADIUS_KM)
            .await
        {
            warn!(
                lat = req.latitude,
                lng = req.longitude,
                error = %e,
                "cache invalidation failed after write"
            );
        }
        Ok(stored)
    }

    /// Fetch one property by id.
    pub async fn get_property(&self, id: &str) -> Result<Property> {
        self.store_deadline(self.store().find_by_id(id))
            .await?
            .ok_or_else(|| ApiError::not_found(format!("property {id}")))
    }

    /// Unfiltered listing page.
    pub async fn list_properties(&self, page: usize) -> Result<PropertyPage> {
        let limit = crate::DEFAULT_LIMIT;
        self.validate_pagination(page, limit)?;

        let total = self.store_deadline(self.store().count_all()).await?;
        let skip = (page - 1).saturating_mul(limit);
        let properties = self
            .store_deadline(self.store().find_page(skip, limit))
            .await?;
        Ok(PropertyPage {
            properties,
            total_pages: (total as usize).div_ceil(limit) as u64,
            current_page: page as u64,
        })
    }

    /// Legacy coordinate-range path: rectangular pre-filter, then a
    /// paginated fetch. Bypasses the cache entirely; kept for comparison
    /// against the geo-near path.
    pub async fn coordinate_range(&self, query: &NearbyQuery) -> Result<NearbyPage> {
        validate_coordinates(query.lat, query.lng)?;
        self.validate_pagination(query.page, query.limit)?;

        let delta = query.radius_km * DEGREES_PER_KM;
        let bounds = BoundingBox {
            lat_min: query.lat - delta,
            lat_max: query.lat + delta,
            lng_min: query.lng - delta,
            lng_max: query.lng + delta,
        };
        let skip = (query.page - 1).saturating_mul(query.limit);
        let (items, total_count) = self
            .store_deadline(self.store().find_in_box(bounds, skip, query.limit))
            .await?;

        let now = Utc::now();
        let mut properties: Vec<ScoredProperty> = items
            .into_iter()
            .map(|property| {
                let distance_km = haversine_km(
                    query.lat,
                    query.lng,
                    property.location.lat,
                    property.location.lon,
                );
                let temporal = temporal_score(&property.bucket_metadata(), now);
                ScoredProperty {
                    relevance: inverse_distance(temporal, distance_km),
                    distance_km,
                    property,
                }
            })
            .collect();
        sort_by_relevance(&mut properties);

        let total_pages = (total_count as usize).div_ceil(query.limit) as u64;
        Ok(NearbyPage {
            properties,
            total_count,
            total_pages,
            current_page: query.page as u64,
            has_more: (query.page as u64) < total_pages,
            metadata: QueryMetadata {
                query_timestamp: now,
                coordinates: GeoPoint::new(query.lng, query.lat),
                radius_km: query.radius_km,
            },
        })
    }

    /// Cache statistics for the stats endpoint.
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            cache_hits: self.optimizer().total_hits(),
            total_data_cached: self.cache().data_bytes().await?,
            total_keys: self.cache().key_count().await?,
            total_documents: self.store_deadline(self.store().count_all()).await?,
        })
    }

    /// Drop every cached bucket and the score index.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache().clear().await?;
        Ok(())
    }
}

/// Content-derived id for records posted without one.
fn generated_id(req: &CreateProperty, now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(req.latitude.to_le_bytes());
    hasher.update(req.longitude.to_le_bytes());
    hasher.update(req.price.to_le_bytes());
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..12])
}
