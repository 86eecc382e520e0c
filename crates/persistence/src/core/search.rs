//! Query-string driven search over any full storage backend.

use async_trait::async_trait;

use crate::core::storage::{BoundaryStorage, PolygonLookup, RecordStorage};
use crate::error::StorageResult;
use crate::filter::{FilterChain, JsonColumn};
use crate::types::{Boundary, BoundaryPolygon, QueryParams, Record, RecordType};

/// Compiles request parameters with the standard filter chains and runs the
/// resulting predicates.
///
/// Implemented for every type that provides record, boundary and polygon
/// storage.
#[async_trait]
pub trait FilteredSearch: RecordStorage + BoundaryStorage + PolygonLookup + Sized {
    /// Searches records with `record_type`, `archived`, `occurred_min`,
    /// `occurred_max`, `jsonb`, `polygon` and `polygon_id`.
    async fn search_records(&self, params: &QueryParams) -> StorageResult<Vec<Record>> {
        let predicate = FilterChain::records(Some(JsonColumn::Data))
            .compile(params, self)
            .await?;
        self.find_records(&predicate).await
    }

    /// Searches record types with `active` and `label`.
    async fn search_record_types(&self, params: &QueryParams) -> StorageResult<Vec<RecordType>> {
        let predicate = FilterChain::record_types().compile(params, self).await?;
        self.find_record_types(&predicate).await
    }

    /// Searches boundaries with `status`.
    async fn search_boundaries(&self, params: &QueryParams) -> StorageResult<Vec<Boundary>> {
        let predicate = FilterChain::boundaries().compile(params, self).await?;
        self.find_boundaries(&predicate).await
    }

    /// Searches boundary polygons with `boundary` and `jsonb`.
    async fn search_polygons(&self, params: &QueryParams) -> StorageResult<Vec<BoundaryPolygon>> {
        let predicate = FilterChain::boundary_polygons(Some(JsonColumn::Data))
            .compile(params, self)
            .await?;
        self.find_polygons(&predicate).await
    }
}

impl<T> FilteredSearch for T where T: RecordStorage + BoundaryStorage + PolygonLookup + Sized {}
