//! Facet aggregation by locality.

use crate::error::Result;
use crate::GeoProx;
use geoprox_store::{AggregateFilters, AggregateGroup};

impl GeoProx {
    /// Group properties by locality, optionally narrowed by equality
    /// filters.
    ///
    /// Returns all groups sorted by total count descending; callers apply
    /// their own minimum-count cutoffs.
    pub async fn aggregate(&self, filters: &AggregateFilters) -> Result<Vec<AggregateGroup>> {
        let mut groups = self
            .store_deadline(self.store().aggregate_by_locality(filters))
            .await?;
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.locality.cmp(&b.locality)));
        Ok(groups)
    }
}
