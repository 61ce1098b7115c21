//! Document store port for GeoProx.
//!
//! The query layer reaches the backing document store only through the
//! [`PropertyStore`] trait: spherical geo-near queries, counts, id lookup,
//! inserts, a rectangular box query for the legacy coordinate-range path,
//! and a grouping aggregation pipeline.
//!
//! Backends must keep a geospatial index on `location` and store
//! coordinates as GeoJSON `Point` pairs in `[lng, lat]` order. The
//! in-memory backend in [`memory`] is the development and test default.

pub mod error;
pub mod memory;
mod port;

pub use error::{Result, StoreError};
pub use memory::MemoryPropertyStore;
pub use port::{AggregateFilters, AggregateGroup, BoundingBox, GeoNearHit, PropertyStore};
