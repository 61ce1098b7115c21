//! Property endpoints: listing, nearby queries, writes, aggregation,
//! cache administration.

use crate::error::{Result, ServerError};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use geoprox_api::{CacheStats, CreateProperty, NearbyPage, NearbyQuery, PropertyPage};
use geoprox_core::model::Property;
use geoprox_core::rank::RankingPrefs;
use geoprox_store::{AggregateFilters, AggregateGroup};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters for the nearby and coordinate-range endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyParams {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
    page: Option<usize>,
    limit: Option<usize>,
    /// Optional ranking preferences
    max_price: Option<f64>,
    /// Comma-separated locality values
    preferred_locations: Option<String>,
    /// Comma-separated property types
    preferred_types: Option<String>,
}

impl NearbyParams {
    /// Build the engine query, requiring both coordinates.
    fn to_query(&self, state: &AppState) -> Result<NearbyQuery> {
        let (Some(lat), Some(lng)) = (self.lat, self.lng) else {
            return Err(ServerError::MissingCoordinates);
        };
        Ok(NearbyQuery {
            lat,
            lng,
            radius_km: self.radius.unwrap_or(state.config.default_radius_km),
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(geoprox_api::DEFAULT_LIMIT),
        })
    }

    fn prefs(&self) -> RankingPrefs {
        fn split(csv: &Option<String>) -> Vec<String> {
            csv.as_deref()
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        }
        RankingPrefs {
            max_price: self.max_price,
            preferred_locations: split(&self.preferred_locations),
            preferred_types: split(&self.preferred_types),
        }
    }
}

/// Query parameters for the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<usize>,
}

/// Handle GET /api/v1/properties
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<PropertyPage>> {
    let page = state.engine.list_properties(params.page.unwrap_or(1)).await?;
    Ok(Json(page))
}

/// Handle GET /api/v1/properties/nearby
pub async fn nearby(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<NearbyPage>> {
    let query = params.to_query(&state)?;
    let prefs = params.prefs();
    let page = if prefs.is_empty() {
        state.engine.nearby(&query).await?
    } else {
        state.engine.nearby_ranked(&query, &prefs).await?
    };
    Ok(Json(page))
}

/// Handle GET /api/v1/properties/coordinate-range-indexing
///
/// Legacy rectangular pre-filter path, kept for comparison against the
/// geo-near path.
pub async fn coordinate_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<NearbyPage>> {
    let query = params.to_query(&state)?;
    Ok(Json(state.engine.coordinate_range(&query).await?))
}

/// Handle POST /api/v1/properties
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProperty>,
) -> Result<(StatusCode, Json<Property>)> {
    let created = state.engine.add_property(body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Handle GET /api/v1/properties/get-property/:id
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Property>> {
    Ok(Json(state.engine.get_property(&id).await?))
}

/// Handle GET /api/v1/properties/aggregate
pub async fn aggregate(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<AggregateFilters>,
) -> Result<Json<Vec<AggregateGroup>>> {
    Ok(Json(state.engine.aggregate(&filters).await?))
}

/// Handle GET /api/v1/properties/cacheStats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Result<Json<CacheStats>> {
    Ok(Json(state.engine.cache_stats().await?))
}

/// Confirmation body for cache clearing.
#[derive(Serialize)]
pub struct ClearCacheResponse {
    status: &'static str,
    message: &'static str,
}

/// Handle DELETE /api/v1/properties/clear-cache
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearCacheResponse>> {
    state.engine.clear_cache().await?;
    Ok(Json(ClearCacheResponse {
        status: "ok",
        message: "cache cleared",
    }))
}
