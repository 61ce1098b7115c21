//! The nearby-query coordinator.
//!
//! End-to-end flow for one query:
//!
//! 1. Validate coordinates and pagination.
//! 2. Derive the cache key from the query cell and radius.
//! 3. Cache hit: record it and return the cached page. Read failures
//!    degrade to a miss (the store is authoritative).
//! 4. Cache miss: count + fetch the page from the document store under
//!    the store deadline, attach `temporal x 1/(1 + d_km)` relevance to
//!    each item, sort descending (ties by distance, then id), and cache
//!    the page, empty results included.
//! 5. Kick off detached warming of the 8 neighbor cells, bounded per cell
//!    and guarded by a short-TTL in-flight marker.

use crate::error::Result;
use crate::{store_deadline, EngineConfig, GeoProx};
use chrono::{DateTime, Utc};
use geoprox_cache::{GeoCache, Lookup};
use geoprox_core::geo::{decode, encode, neighbors, validate_coordinates};
use geoprox_core::model::{BucketMetadata, GeoPoint, Property};
use geoprox_core::rank::{inverse_distance, relevance, RankingPrefs};
use geoprox_core::score::temporal_score;
use geoprox_store::PropertyStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A validated nearby query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
    pub page: usize,
    pub limit: usize,
}

impl NearbyQuery {
    /// Query at the default radius, first page, default limit.
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            radius_km: crate::DEFAULT_RADIUS_KM,
            page: 1,
            limit: crate::DEFAULT_LIMIT,
        }
    }

    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn with_page(mut self, page: usize, limit: usize) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }
}

/// A result item with its distance and computed relevance attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredProperty {
    #[serde(flatten)]
    pub property: Property,
    pub distance_km: f64,
    pub relevance: f64,
}

/// Query echo attached to every result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub query_timestamp: DateTime<Utc>,
    pub coordinates: GeoPoint,
    pub radius_km: f64,
}

/// One page of nearby results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPage {
    pub properties: Vec<ScoredProperty>,
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub has_more: bool,
    pub metadata: QueryMetadata,
}

impl GeoProx {
    /// Execute a nearby query through the cache.
    pub async fn nearby(&self, query: &NearbyQuery) -> Result<NearbyPage> {
        validate_coordinates(query.lat, query.lng)?;
        self.validate_pagination(query.page, query.limit)?;

        let key = GeoCache::key_for(query.lat, query.lng, query.radius_km)?;
        let cell = GeoCache::cell_of(&key)
            .expect("key_for always produces a well-formed key")
            .to_string();

        match self.cache().get(&key).await {
            Ok(Lookup::Hit(bucket)) => {
                self.optimizer().record_hit(&cell).await;
                debug!(%key, "nearby cache hit");
                return Ok(serde_json::from_value(bucket.data)?);
            }
            Ok(Lookup::Miss) => {
                self.optimizer().record_miss(&cell).await;
            }
            Err(e) => {
                // KV read failures degrade to a miss; the store is authoritative
                warn!(%key, error = %e, "cache read failed, querying store directly");
                self.optimizer().record_miss(&cell).await;
            }
        }

        let now = Utc::now();
        let page = fetch_page(
            self.store(),
            self.config().store_deadline,
            query.lat,
            query.lng,
            query.radius_km,
            query.page,
            query.limit,
            now,
        )
        .await?;

        // Positive caching: empty pages are cached too. List payloads are
        // scored from the write instant with no attribute boosts.
        let metadata = BucketMetadata::from_write_time(now);
        if let Err(e) = self
            .cache()
            .put_at(&key, serde_json::to_value(&page)?, metadata, now)
            .await
        {
            warn!(%key, error = %e, "cache write failed, serving uncached");
        }

        self.spawn_neighbor_warming(query.lat, query.lng, query.radius_km);
        Ok(page)
    }

    /// Nearby query re-ranked with user preferences.
    ///
    /// The cached bucket stays preference-agnostic: preferences are
    /// applied to the retrieved page, replacing each item's relevance
    /// with the full preference-aware score before re-sorting.
    pub async fn nearby_ranked(
        &self,
        query: &NearbyQuery,
        prefs: &RankingPrefs,
    ) -> Result<NearbyPage> {
        let mut page = self.nearby(query).await?;
        if prefs.is_empty() {
            return Ok(page);
        }
        let now = Utc::now();
        for item in &mut page.properties {
            item.relevance = relevance(&item.property, Some((query.lat, query.lng)), prefs, now);
        }
        sort_by_relevance(&mut page.properties);
        Ok(page)
    }

    /// Detach a task that warms the 8 neighbors of the queried cell.
    ///
    /// Never blocks the caller; once spawned it runs to completion
    /// independently of the originating request.
    fn spawn_neighbor_warming(&self, lat: f64, lng: f64, radius_km: f64) {
        let cache = self.cache().clone();
        let store = self.store().clone();
        let config = self.config().clone();
        tokio::spawn(async move {
            if let Err(e) = warm_neighbors(&cache, &store, &config, lat, lng, radius_km).await {
                debug!(error = %e, "neighbor warming aborted");
            }
        });
    }
}

/// Warm all 8 neighbors of the cell containing `(lat, lng)`.
pub(crate) async fn warm_neighbors(
    cache: &Arc<GeoCache>,
    store: &Arc<dyn PropertyStore>,
    config: &EngineConfig,
    lat: f64,
    lng: f64,
    radius_km: f64,
) -> Result<()> {
    let center = encode(lat, lng, GeoCache::precision_for(radius_km))?;
    for cell in neighbors(&center)? {
        if let Err(e) = warm_cell(cache, store, config, &cell, radius_km).await {
            // Warming is best-effort: log and move to the next cell
            debug!(cell = %cell, error = %e, "cell warming failed");
        }
    }
    Ok(())
}

/// Populate one neighbor cell unless it is already cached or another
/// warmer holds the in-flight marker.
async fn warm_cell(
    cache: &Arc<GeoCache>,
    store: &Arc<dyn PropertyStore>,
    config: &EngineConfig,
    cell: &str,
    radius_km: f64,
) -> Result<()> {
    let key = GeoCache::key_for_cell(cell, radius_km);
    if cache.contains(&key).await.unwrap_or(false) {
        return Ok(());
    }
    let marker = format!("warm:{key}");
    if !cache
        .try_mark(&marker, config.warm_marker_ttl)
        .await
        .unwrap_or(false)
    {
        return Ok(());
    }

    let (lat, lng) = decode(cell)?;
    let now = Utc::now();
    let page = fetch_page(
        store,
        config.store_deadline,
        lat,
        lng,
        radius_km,
        1,
        config.warm_limit,
        now,
    )
    .await?;

    let metadata = BucketMetadata::from_write_time(now);
    cache
        .put_at(&key, serde_json::to_value(&page)?, metadata, now)
        .await?;
    debug!(%key, items = page.properties.len(), "warmed neighbor cell");
    Ok(())
}

/// Fetch and score one page straight from the document store.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn fetch_page(
    store: &Arc<dyn PropertyStore>,
    deadline: std::time::Duration,
    lat: f64,
    lng: f64,
    radius_km: f64,
    page: usize,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<NearbyPage> {
    let center = GeoPoint::new(lng, lat);
    let max_meters = radius_km * 1000.0;

    let total_count = store_deadline(deadline, store.count_near(center, max_meters)).await?;
    let skip = (page - 1).saturating_mul(limit);
    let hits = store_deadline(deadline, store.geo_near(center, max_meters, skip, limit)).await?;

    let mut properties: Vec<ScoredProperty> = hits
        .into_iter()
        .map(|hit| {
            let distance_km = hit.distance_m / 1000.0;
            let temporal = temporal_score(&hit.property.bucket_metadata(), now);
            ScoredProperty {
                relevance: inverse_distance(temporal, distance_km),
                distance_km,
                property: hit.property,
            }
        })
        .collect();
    sort_by_relevance(&mut properties);

    let total_pages = (total_count as usize).div_ceil(limit) as u64;
    Ok(NearbyPage {
        properties,
        total_count,
        total_pages,
        current_page: page as u64,
        has_more: (page as u64) < total_pages,
        metadata: QueryMetadata {
            query_timestamp: now,
            coordinates: center,
            radius_km,
        },
    })
}

/// Descending relevance; ties break by ascending distance, then id.
pub(crate) fn sort_by_relevance(properties: &mut [ScoredProperty]) {
    properties.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.property.id.cmp(&b.property.id))
    });
}
