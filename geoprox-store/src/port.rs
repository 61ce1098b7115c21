//! The [`PropertyStore`] trait and its query/result types.

use crate::error::Result;
use async_trait::async_trait;
use geoprox_core::model::{GeoPoint, Property};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A geo-near result: the record plus its distance from the query center.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNearHit {
    pub property: Property,
    pub distance_m: f64,
}

/// Rectangular coordinate bounds for the legacy range path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.lat_min
            && point.lat <= self.lat_max
            && point.lon >= self.lng_min
            && point.lon <= self.lng_max
    }
}

/// Optional equality filters narrowing an aggregation's source set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregateFilters {
    pub room_type: Option<String>,
    pub property_type: Option<String>,
    pub cancellation_policy: Option<String>,
    pub host_identity_verified: Option<String>,
    pub purpose: Option<String>,
}

impl AggregateFilters {
    pub fn matches(&self, property: &Property) -> bool {
        fn ok(filter: &Option<String>, value: &Option<String>) -> bool {
            match filter {
                Some(wanted) => value.as_deref() == Some(wanted.as_str()),
                None => true,
            }
        }
        ok(&self.room_type, &property.room_type)
            && ok(&self.property_type, &property.property_type)
            && ok(&self.cancellation_policy, &property.cancellation_policy)
            && ok(&self.host_identity_verified, &property.host_identity_verified)
            && ok(&self.purpose, &property.purpose)
    }
}

/// One locality group produced by the aggregation pipeline.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateGroup {
    /// Locality value (the grouping key)
    pub locality: String,
    pub count: u64,
    pub for_sale: u64,
    pub for_rent: u64,
    /// Unique values observed in the group, sorted
    pub room_types: Vec<String>,
    pub property_types: Vec<String>,
    pub cancellation_policies: Vec<String>,
    pub host_identity_verified: Vec<String>,
}

/// Port to the backing document store.
///
/// `geo_near` and `count_near` use spherical distance semantics; hits come
/// back ordered by ascending distance (ties by id), the way a 2dsphere
/// `$geoNear` stage returns them.
#[async_trait]
pub trait PropertyStore: Debug + Send + Sync {
    /// Page of records within `max_meters` of `center`, nearest first.
    async fn geo_near(
        &self,
        center: GeoPoint,
        max_meters: f64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<GeoNearHit>>;

    /// Count of records within `max_meters` of `center`.
    async fn count_near(&self, center: GeoPoint, max_meters: f64) -> Result<u64>;

    /// Fetch one record by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Property>>;

    /// Persist a record; replaces any record with the same id.
    async fn insert(&self, property: Property) -> Result<Property>;

    /// Page of records inside a rectangular box (legacy range path).
    /// Returns the page plus the total count inside the box.
    async fn find_in_box(
        &self,
        bounds: BoundingBox,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Property>, u64)>;

    /// Unfiltered listing page, insertion order.
    async fn find_page(&self, skip: usize, limit: usize) -> Result<Vec<Property>>;

    /// Total number of stored records.
    async fn count_all(&self) -> Result<u64>;

    /// Group records by their locality value (`category_key`), after
    /// applying `filters`. Groups come back sorted by count descending.
    async fn aggregate_by_locality(
        &self,
        filters: &AggregateFilters,
    ) -> Result<Vec<AggregateGroup>>;
}
