//! Shared fixtures for the persistence integration tests.

#![allow(dead_code)]

use ashlar_persistence::backends::sqlite::SqliteBackend;
use ashlar_persistence::core::{BoundaryStorage, RecordStorage, SchemaStorage};
use ashlar_persistence::types::{
    Boundary, BoundaryPolygon, BoundaryStatus, Record, RecordSchema, RecordType,
};
use chrono::{DateTime, TimeZone, Utc};
use geo::{Geometry, Point, polygon};
use serde_json::{Value, json};

/// Creates an in-memory backend with the schema installed.
pub fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

/// A Draft 4 schema for incident records.
pub fn incident_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "object",
        "properties": {
            "Site": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "lanes": {"type": "integer"}
                }
            },
            "severity": {"enum": ["low", "medium", "high"]}
        }
    })
}

/// Axis-aligned square with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> Geometry<f64> {
    Geometry::Polygon(polygon![
        (x: x, y: y),
        (x: x, y: y + size),
        (x: x + size, y: y + size),
        (x: x + size, y: y),
        (x: x, y: y),
    ])
}

/// GeoJSON text of [`square`].
pub fn square_geojson(x: f64, y: f64, size: f64) -> String {
    ashlar_persistence::types::geometry::to_geojson_string(&square(x, y, size))
}

/// A self-intersecting ring.
pub const BOWTIE_GEOJSON: &str =
    r#"{"type":"Polygon","coordinates":[[[0,0],[2,2],[2,0],[0,2],[0,0]]]}"#;

/// Midnight UTC on the given day.
pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A record type with one published schema.
pub struct IncidentType {
    pub record_type: RecordType,
    pub schema: RecordSchema,
}

/// Creates the "Incident" record type and publishes [`incident_schema`].
pub async fn create_incident_type(backend: &SqliteBackend) -> IncidentType {
    let record_type = backend
        .create_record_type(RecordType::new("Incident", "Incidents"))
        .await
        .expect("Failed to create record type");
    let schema = backend
        .publish_schema(record_type.uuid, incident_schema())
        .await
        .expect("Failed to publish schema");
    IncidentType {
        record_type,
        schema,
    }
}

/// Inserts an incident at `(x, y)` that occurred on `occurred_from`.
pub async fn create_incident(
    backend: &SqliteBackend,
    incident: &IncidentType,
    data: Value,
    location: Option<(f64, f64)>,
    occurred_from: DateTime<Utc>,
) -> Record {
    let mut record = Record::new(&incident.schema, data, occurred_from);
    if let Some((x, y)) = location {
        record = record.with_geometry(Geometry::Point(Point::new(x, y)));
    }
    backend
        .create_record(record)
        .await
        .expect("Failed to create record")
}

/// Creates a boundary with the given status.
pub async fn create_boundary(
    backend: &SqliteBackend,
    label: &str,
    status: BoundaryStatus,
) -> Boundary {
    backend
        .create_boundary(Boundary::new(label).with_status(status))
        .await
        .expect("Failed to create boundary")
}

/// Adds a polygon to a boundary.
pub async fn create_polygon(
    backend: &SqliteBackend,
    boundary: &Boundary,
    geom: Geometry<f64>,
    data: Value,
) -> BoundaryPolygon {
    backend
        .create_polygon(BoundaryPolygon::new(boundary.uuid, geom, data))
        .await
        .expect("Failed to create polygon")
}

/// Sorted identifiers of `items`, for order-insensitive comparisons.
pub fn sorted_ids<T>(items: &[T], id: impl Fn(&T) -> uuid::Uuid) -> Vec<uuid::Uuid> {
    let mut ids: Vec<_> = items.iter().map(id).collect();
    ids.sort();
    ids
}
