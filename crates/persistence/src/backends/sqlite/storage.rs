//! RecordStorage, BoundaryStorage and PolygonLookup implementations for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::Geometry;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{BoundaryStorage, PolygonLookup, RecordStorage};
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::filter::Predicate;
use crate::schema::SchemaValidator;
use crate::types::geometry::{bounding_box, from_geojson_str, to_geojson_string, validity_reason};
use crate::types::{Boundary, BoundaryPolygon, BoundaryStatus, Record, RecordType};

use super::SqliteBackend;
use super::backend::BACKEND_NAME;
use super::query_builder::{QueryBuilder, format_timestamp};

pub(super) fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    })
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

// ============================================================================
// Column codecs
// ============================================================================

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

pub(super) fn get_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

pub(super) fn get_optional_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| Uuid::parse_str(&t).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(super) fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn get_optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

pub(super) fn get_json(row: &Row<'_>, idx: usize) -> rusqlite::Result<Value> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn get_optional_json(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| serde_json::from_str(&t).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn get_geometry(row: &Row<'_>, idx: usize) -> rusqlite::Result<Geometry<f64>> {
    let text: String = row.get(idx)?;
    from_geojson_str(&text).map_err(|e| conversion_error(idx, e))
}

fn get_optional_geometry(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Geometry<f64>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| from_geojson_str(&t).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn get_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<BoundaryStatus> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: String| conversion_error(idx, e))
}

fn encode_json(value: &Value) -> StorageResult<String> {
    serde_json::to_string(value)
        .map_err(|e| serialization_error(format!("Failed to serialize document: {}", e)))
}

fn require_document(resource_type: &'static str, data: &Value) -> StorageResult<()> {
    if data.is_object() || data.is_array() {
        Ok(())
    } else {
        Err(StorageError::Resource(ResourceError::InvalidDocument {
            resource_type,
            field: "data",
        }))
    }
}

fn require_valid_geometry(resource_type: &'static str, geometry: &Geometry<f64>) -> StorageResult<()> {
    match validity_reason(geometry) {
        None => Ok(()),
        Some(reason) => Err(StorageError::Resource(ResourceError::InvalidGeometry {
            resource_type,
            reason,
        })),
    }
}

fn exists(conn: &Connection, table: &str, id: Uuid) -> StorageResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE uuid = ?1)", table);
    conn.query_row(&sql, [id.to_string()], |row| row.get(0))
        .map_err(|e| internal_error(format!("Failed to check {}: {}", table, e)))
}

/// Runs a `SELECT` with a pushed-down predicate and finishes any residual
/// conditions in-process.
fn select_matching<T, F>(
    conn: &Connection,
    select: &str,
    order_by: &str,
    predicate: &Predicate,
    map_row: F,
) -> StorageResult<Vec<T>>
where
    T: crate::filter::Filterable,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let query = QueryBuilder::build(predicate);
    let sql = format!("{}{} ORDER BY {}", select, query.filter.where_clause(), order_by);
    debug!(sql = %sql, residual = query.residual, "Executing filtered query");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
    let rows = stmt
        .query_map(params_from_iter(query.filter.params.iter()), map_row)
        .map_err(|e| internal_error(format!("Failed to execute query: {}", e)))?;

    let mut matched = Vec::new();
    for row in rows {
        let item = row.map_err(|e| internal_error(format!("Failed to read row: {}", e)))?;
        if !query.residual || predicate.matches(&item) {
            matched.push(item);
        }
    }
    Ok(matched)
}

// ============================================================================
// Record types and records
// ============================================================================

const RECORD_TYPE_COLUMNS: &str =
    "SELECT uuid, label, plural_label, description, active, created, modified FROM record_types";

fn map_record_type(row: &Row<'_>) -> rusqlite::Result<RecordType> {
    Ok(RecordType {
        uuid: get_uuid(row, 0)?,
        label: row.get(1)?,
        plural_label: row.get(2)?,
        description: row.get(3)?,
        active: row.get(4)?,
        created: get_timestamp(row, 5)?,
        modified: get_timestamp(row, 6)?,
    })
}

const RECORD_COLUMNS: &str = "SELECT uuid, record_type_id, schema_id, data, geom, occurred_from, \
     occurred_to, archived, created, modified FROM records";

fn map_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        uuid: get_uuid(row, 0)?,
        record_type: get_uuid(row, 1)?,
        schema: get_uuid(row, 2)?,
        data: get_json(row, 3)?,
        geom: get_optional_geometry(row, 4)?,
        occurred_from: get_timestamp(row, 5)?,
        occurred_to: get_optional_timestamp(row, 6)?,
        archived: row.get(7)?,
        created: get_timestamp(row, 8)?,
        modified: get_timestamp(row, 9)?,
    })
}

#[async_trait]
impl RecordStorage for SqliteBackend {
    async fn create_record_type(&self, record_type: RecordType) -> StorageResult<RecordType> {
        let conn = self.get_connection()?;
        if exists(&conn, "record_types", record_type.uuid)? {
            return Err(StorageError::Resource(ResourceError::AlreadyExists {
                resource_type: "RecordType",
                id: record_type.uuid,
            }));
        }

        conn.execute(
            "INSERT INTO record_types (uuid, label, plural_label, description, active, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record_type.uuid.to_string(),
                record_type.label,
                record_type.plural_label,
                record_type.description,
                record_type.active,
                format_timestamp(&record_type.created),
                format_timestamp(&record_type.modified),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert record type: {}", e)))?;

        debug!(record_type = %record_type.uuid, label = %record_type.label, "Created record type");
        Ok(record_type)
    }

    async fn read_record_type(&self, id: Uuid) -> StorageResult<Option<RecordType>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!("{} WHERE uuid = ?1", RECORD_TYPE_COLUMNS),
            [id.to_string()],
            map_record_type,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read record type: {}", e)))
    }

    async fn find_record_types(&self, predicate: &Predicate) -> StorageResult<Vec<RecordType>> {
        let conn = self.get_connection()?;
        select_matching(&conn, RECORD_TYPE_COLUMNS, "label, uuid", predicate, map_record_type)
    }

    async fn create_record(&self, mut record: Record) -> StorageResult<Record> {
        require_document("Record", &record.data)?;
        if let Some(geom) = &record.geom {
            require_valid_geometry("Record", geom)?;
        }

        let conn = self.get_connection()?;
        let schema = conn
            .query_row(
                "SELECT record_type_id, schema FROM record_schemas WHERE uuid = ?1",
                [record.schema.to_string()],
                |row| Ok((get_uuid(row, 0)?, get_json(row, 1)?)),
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to read record schema: {}", e)))?;
        let Some((record_type, schema)) = schema else {
            return Err(StorageError::Resource(ResourceError::NotFound {
                resource_type: "RecordSchema",
                id: record.schema,
            }));
        };
        SchemaValidator::validate_data(record.schema, &schema, &record.data)
            .map_err(StorageError::Schema)?;
        record.record_type = record_type;

        if exists(&conn, "records", record.uuid)? {
            return Err(StorageError::Resource(ResourceError::AlreadyExists {
                resource_type: "Record",
                id: record.uuid,
            }));
        }

        let bbox = record.geom.as_ref().and_then(bounding_box);
        conn.execute(
            "INSERT INTO records (uuid, record_type_id, schema_id, data, geom,
                 geom_min_x, geom_min_y, geom_max_x, geom_max_y,
                 occurred_from, occurred_to, archived, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.uuid.to_string(),
                record.record_type.to_string(),
                record.schema.to_string(),
                encode_json(&record.data)?,
                record.geom.as_ref().map(to_geojson_string),
                bbox.map(|b| b.0),
                bbox.map(|b| b.1),
                bbox.map(|b| b.2),
                bbox.map(|b| b.3),
                format_timestamp(&record.occurred_from),
                record.occurred_to.as_ref().map(format_timestamp),
                record.archived,
                format_timestamp(&record.created),
                format_timestamp(&record.modified),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert record: {}", e)))?;

        debug!(record = %record.uuid, schema = %record.schema, "Created record");
        Ok(record)
    }

    async fn read_record(&self, id: Uuid) -> StorageResult<Option<Record>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!("{} WHERE uuid = ?1", RECORD_COLUMNS),
            [id.to_string()],
            map_record,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read record: {}", e)))
    }

    async fn find_records(&self, predicate: &Predicate) -> StorageResult<Vec<Record>> {
        let conn = self.get_connection()?;
        select_matching(
            &conn,
            RECORD_COLUMNS,
            "occurred_from DESC, uuid",
            predicate,
            map_record,
        )
    }
}

// ============================================================================
// Boundaries and polygons
// ============================================================================

const BOUNDARY_COLUMNS: &str =
    "SELECT uuid, label, status, errors, created, modified FROM boundaries";

fn map_boundary(row: &Row<'_>) -> rusqlite::Result<Boundary> {
    Ok(Boundary {
        uuid: get_uuid(row, 0)?,
        label: row.get(1)?,
        status: get_status(row, 2)?,
        errors: get_optional_json(row, 3)?,
        created: get_timestamp(row, 4)?,
        modified: get_timestamp(row, 5)?,
    })
}

const POLYGON_COLUMNS: &str =
    "SELECT uuid, boundary_id, geom, data, created, modified FROM boundary_polygons";

fn map_polygon(row: &Row<'_>) -> rusqlite::Result<BoundaryPolygon> {
    Ok(BoundaryPolygon {
        uuid: get_uuid(row, 0)?,
        boundary: get_uuid(row, 1)?,
        geom: get_geometry(row, 2)?,
        data: get_json(row, 3)?,
        created: get_timestamp(row, 4)?,
        modified: get_timestamp(row, 5)?,
    })
}

#[async_trait]
impl BoundaryStorage for SqliteBackend {
    async fn create_boundary(&self, boundary: Boundary) -> StorageResult<Boundary> {
        let conn = self.get_connection()?;
        if exists(&conn, "boundaries", boundary.uuid)? {
            return Err(StorageError::Resource(ResourceError::AlreadyExists {
                resource_type: "Boundary",
                id: boundary.uuid,
            }));
        }

        let errors = boundary.errors.as_ref().map(encode_json).transpose()?;
        conn.execute(
            "INSERT INTO boundaries (uuid, label, status, errors, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                boundary.uuid.to_string(),
                boundary.label,
                boundary.status.as_str(),
                errors,
                format_timestamp(&boundary.created),
                format_timestamp(&boundary.modified),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert boundary: {}", e)))?;

        debug!(boundary = %boundary.uuid, status = %boundary.status, "Created boundary");
        Ok(boundary)
    }

    async fn read_boundary(&self, id: Uuid) -> StorageResult<Option<Boundary>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!("{} WHERE uuid = ?1", BOUNDARY_COLUMNS),
            [id.to_string()],
            map_boundary,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read boundary: {}", e)))
    }

    async fn find_boundaries(&self, predicate: &Predicate) -> StorageResult<Vec<Boundary>> {
        let conn = self.get_connection()?;
        select_matching(&conn, BOUNDARY_COLUMNS, "created, uuid", predicate, map_boundary)
    }

    async fn create_polygon(&self, polygon: BoundaryPolygon) -> StorageResult<BoundaryPolygon> {
        require_document("BoundaryPolygon", &polygon.data)?;
        require_valid_geometry("BoundaryPolygon", &polygon.geom)?;
        let Some((min_x, min_y, max_x, max_y)) = bounding_box(&polygon.geom) else {
            return Err(StorageError::Resource(ResourceError::InvalidGeometry {
                resource_type: "BoundaryPolygon",
                reason: "geometry is empty".to_string(),
            }));
        };

        let conn = self.get_connection()?;
        if !exists(&conn, "boundaries", polygon.boundary)? {
            return Err(StorageError::Resource(ResourceError::NotFound {
                resource_type: "Boundary",
                id: polygon.boundary,
            }));
        }
        if exists(&conn, "boundary_polygons", polygon.uuid)? {
            return Err(StorageError::Resource(ResourceError::AlreadyExists {
                resource_type: "BoundaryPolygon",
                id: polygon.uuid,
            }));
        }

        conn.execute(
            "INSERT INTO boundary_polygons (uuid, boundary_id, data, geom,
                 geom_min_x, geom_min_y, geom_max_x, geom_max_y, created, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                polygon.uuid.to_string(),
                polygon.boundary.to_string(),
                encode_json(&polygon.data)?,
                to_geojson_string(&polygon.geom),
                min_x,
                min_y,
                max_x,
                max_y,
                format_timestamp(&polygon.created),
                format_timestamp(&polygon.modified),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert boundary polygon: {}", e)))?;

        debug!(polygon = %polygon.uuid, boundary = %polygon.boundary, "Created boundary polygon");
        Ok(polygon)
    }

    async fn read_polygon(&self, id: Uuid) -> StorageResult<Option<BoundaryPolygon>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!("{} WHERE uuid = ?1", POLYGON_COLUMNS),
            [id.to_string()],
            map_polygon,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read boundary polygon: {}", e)))
    }

    async fn find_polygons(&self, predicate: &Predicate) -> StorageResult<Vec<BoundaryPolygon>> {
        let conn = self.get_connection()?;
        select_matching(&conn, POLYGON_COLUMNS, "created, uuid", predicate, map_polygon)
    }
}

#[async_trait]
impl PolygonLookup for SqliteBackend {
    async fn polygon_geometry(&self, id: Uuid) -> StorageResult<Option<Geometry<f64>>> {
        let conn = self.get_connection()?;
        let geometry = conn
            .query_row(
                "SELECT geom FROM boundary_polygons WHERE uuid = ?1",
                [id.to_string()],
                |row| get_geometry(row, 0),
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to read polygon geometry: {}", e)))?;

        if let Some(reason) = geometry.as_ref().and_then(validity_reason) {
            warn!(polygon = %id, reason = %reason, "Stored boundary polygon geometry is invalid");
        }
        Ok(geometry)
    }
}
