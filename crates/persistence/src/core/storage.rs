//! Storage traits for records, boundaries and schema versions.
//!
//! Backends implement these traits; filter chains only ever see
//! [`PolygonLookup`]. Finder methods take a compiled [`Predicate`] and
//! return every stored row it matches.

use std::collections::HashMap;

use async_trait::async_trait;
use geo::Geometry;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::filter::Predicate;
use crate::schema::SchemaVersionChain;
use crate::types::{Boundary, BoundaryPolygon, Record, RecordSchema, RecordType};

/// Resolves boundary polygon identifiers to their geometry.
///
/// This is the only I/O a filter chain performs.
#[async_trait]
pub trait PolygonLookup: Send + Sync {
    /// Returns the stored geometry of a boundary polygon, or `None` if no
    /// polygon has this identifier.
    async fn polygon_geometry(&self, id: Uuid) -> StorageResult<Option<Geometry<f64>>>;
}

#[async_trait]
impl PolygonLookup for HashMap<Uuid, Geometry<f64>> {
    async fn polygon_geometry(&self, id: Uuid) -> StorageResult<Option<Geometry<f64>>> {
        Ok(self.get(&id).cloned())
    }
}

/// Storage for record types and records.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Inserts a record type.
    ///
    /// # Errors
    ///
    /// * `ResourceError::AlreadyExists` - a record type with this uuid exists
    async fn create_record_type(&self, record_type: RecordType) -> StorageResult<RecordType>;

    /// Reads a record type by identifier.
    async fn read_record_type(&self, id: Uuid) -> StorageResult<Option<RecordType>>;

    /// Returns every record type matching `predicate`, ordered by label.
    async fn find_record_types(&self, predicate: &Predicate) -> StorageResult<Vec<RecordType>>;

    /// Inserts a record.
    ///
    /// # Errors
    ///
    /// * `ResourceError::InvalidDocument` - `data` is not object or array rooted
    /// * `ResourceError::InvalidGeometry` - the geometry fails the validity check
    /// * `ResourceError::NotFound` - the schema version does not exist
    /// * `SchemaError::DataValidation` - `data` does not satisfy the schema
    async fn create_record(&self, record: Record) -> StorageResult<Record>;

    /// Reads a record by identifier.
    async fn read_record(&self, id: Uuid) -> StorageResult<Option<Record>>;

    /// Returns every record matching `predicate`, newest event first.
    async fn find_records(&self, predicate: &Predicate) -> StorageResult<Vec<Record>>;
}

/// Storage for boundaries and their polygons.
#[async_trait]
pub trait BoundaryStorage: Send + Sync {
    /// Inserts a boundary.
    async fn create_boundary(&self, boundary: Boundary) -> StorageResult<Boundary>;

    /// Reads a boundary by identifier.
    async fn read_boundary(&self, id: Uuid) -> StorageResult<Option<Boundary>>;

    /// Returns every boundary matching `predicate`.
    async fn find_boundaries(&self, predicate: &Predicate) -> StorageResult<Vec<Boundary>>;

    /// Inserts a polygon. The owning boundary must exist and the geometry
    /// must be valid.
    async fn create_polygon(&self, polygon: BoundaryPolygon) -> StorageResult<BoundaryPolygon>;

    /// Reads a polygon by identifier.
    async fn read_polygon(&self, id: Uuid) -> StorageResult<Option<BoundaryPolygon>>;

    /// Returns every polygon matching `predicate`.
    async fn find_polygons(&self, predicate: &Predicate) -> StorageResult<Vec<BoundaryPolygon>>;
}

/// Storage for the per-record-type schema version chain.
///
/// [`publish_schema`](SchemaStorage::publish_schema) is the only way chain
/// pointers change.
#[async_trait]
pub trait SchemaStorage: Send + Sync {
    /// Publishes a new schema version for a record type.
    ///
    /// The document is checked against the Draft 4 meta-schema first. The
    /// new version becomes the head of the chain and the previous head, if
    /// any, is linked to it, atomically.
    ///
    /// # Errors
    ///
    /// * `SchemaError::InvalidSchema` - the document is not a valid schema;
    ///   the chain is untouched
    /// * `SchemaError::RecordTypeNotFound` - the record type does not exist
    async fn publish_schema(&self, record_type: Uuid, schema: Value) -> StorageResult<RecordSchema>;

    /// Reads one schema version by identifier.
    async fn get_schema(&self, id: Uuid) -> StorageResult<Option<RecordSchema>>;

    /// Returns the head of a record type's chain.
    async fn current_schema(&self, record_type: Uuid) -> StorageResult<Option<RecordSchema>>;

    /// Returns a record type's whole chain, oldest first.
    async fn schema_chain(&self, record_type: Uuid) -> StorageResult<SchemaVersionChain>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[tokio::test]
    async fn test_hash_map_polygon_lookup() {
        let id = Uuid::new_v4();
        let point = Geometry::Point(Point::new(1.0, 2.0));
        let lookup = HashMap::from([(id, point.clone())]);

        assert_eq!(lookup.polygon_geometry(id).await.unwrap(), Some(point));
        assert_eq!(lookup.polygon_geometry(Uuid::new_v4()).await.unwrap(), None);
    }
}
