//! In-memory reference implementation of the [`PropertyStore`] port.
//!
//! Geo-near queries compute haversine distances over the full set; good
//! enough for tests and single-node development, where record counts are
//! small. Ordering matches a 2dsphere `$geoNear`: ascending distance,
//! ties broken by id.

use crate::error::Result;
use crate::port::{
    AggregateFilters, AggregateGroup, BoundingBox, GeoNearHit, PropertyStore,
};
use async_trait::async_trait;
use geoprox_core::geo::haversine_km;
use geoprox_core::model::{GeoPoint, Property};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// In-memory property store.
#[derive(Default)]
pub struct MemoryPropertyStore {
    records: RwLock<Vec<Property>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a batch of records (test/dev helper).
    pub async fn seed(&self, properties: impl IntoIterator<Item = Property>) {
        let mut records = self.records.write().await;
        for p in properties {
            upsert(&mut records, p);
        }
    }
}

impl std::fmt::Debug for MemoryPropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPropertyStore").finish_non_exhaustive()
    }
}

fn upsert(records: &mut Vec<Property>, property: Property) {
    match records.iter_mut().find(|p| p.id == property.id) {
        Some(slot) => *slot = property,
        None => records.push(property),
    }
}

fn distance_m(center: &GeoPoint, p: &Property) -> f64 {
    haversine_km(center.lat, center.lon, p.location.lat, p.location.lon) * 1000.0
}

#[async_trait]
impl PropertyStore for MemoryPropertyStore {
    async fn geo_near(
        &self,
        center: GeoPoint,
        max_meters: f64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<GeoNearHit>> {
        let records = self.records.read().await;
        let mut hits: Vec<GeoNearHit> = records
            .iter()
            .filter_map(|p| {
                let d = distance_m(&center, p);
                (d <= max_meters).then(|| GeoNearHit {
                    property: p.clone(),
                    distance_m: d,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance_m
                .partial_cmp(&b.distance_m)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.property.id.cmp(&b.property.id))
        });
        Ok(hits.into_iter().skip(skip).take(limit).collect())
    }

    async fn count_near(&self, center: GeoPoint, max_meters: f64) -> Result<u64> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|p| distance_m(&center, p) <= max_meters)
            .count() as u64)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Property>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, property: Property) -> Result<Property> {
        let mut records = self.records.write().await;
        upsert(&mut records, property.clone());
        Ok(property)
    }

    async fn find_in_box(
        &self,
        bounds: BoundingBox,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Property>, u64)> {
        let records = self.records.read().await;
        let matching: Vec<&Property> = records
            .iter()
            .filter(|p| bounds.contains(&p.location))
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn find_page(&self, skip: usize, limit: usize) -> Result<Vec<Property>> {
        let records = self.records.read().await;
        Ok(records.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn aggregate_by_locality(
        &self,
        filters: &AggregateFilters,
    ) -> Result<Vec<AggregateGroup>> {
        #[derive(Default)]
        struct Acc {
            count: u64,
            for_sale: u64,
            for_rent: u64,
            room_types: BTreeSet<String>,
            property_types: BTreeSet<String>,
            cancellation_policies: BTreeSet<String>,
            host_identity_verified: BTreeSet<String>,
        }

        let records = self.records.read().await;
        let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
        for p in records.iter().filter(|p| filters.matches(p)) {
            let acc = groups.entry(p.category_key.clone()).or_default();
            acc.count += 1;
            match p.purpose.as_deref() {
                Some("for-sale") => acc.for_sale += 1,
                Some("for-rent") => acc.for_rent += 1,
                _ => {}
            }
            if let Some(v) = &p.room_type {
                acc.room_types.insert(v.clone());
            }
            if let Some(v) = &p.property_type {
                acc.property_types.insert(v.clone());
            }
            if let Some(v) = &p.cancellation_policy {
                acc.cancellation_policies.insert(v.clone());
            }
            if let Some(v) = &p.host_identity_verified {
                acc.host_identity_verified.insert(v.clone());
            }
        }

        let mut out: Vec<AggregateGroup> = groups
            .into_iter()
            .map(|(locality, acc)| AggregateGroup {
                locality,
                count: acc.count,
                for_sale: acc.for_sale,
                for_rent: acc.for_rent,
                room_types: acc.room_types.into_iter().collect(),
                property_types: acc.property_types.into_iter().collect(),
                cancellation_policies: acc.cancellation_policies.into_iter().collect(),
                host_identity_verified: acc.host_identity_verified.into_iter().collect(),
            })
            .collect();
        // Descending by count; ties keep locality order from the BTreeMap
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.locality.cmp(&b.locality)));
        Ok(out)
    }
}
