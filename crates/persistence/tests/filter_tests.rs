//! Filter chain compilation tests.
//!
//! These run the standard chains against an in-memory polygon lookup, so no
//! database is involved.

mod common;

use std::collections::HashMap;

use ashlar_persistence::error::{FilterError, StorageError};
use ashlar_persistence::filter::builders::{max_sentinel, min_sentinel};
use ashlar_persistence::filter::{Column, FilterChain, JsonColumn, Predicate, ScalarValue};
use ashlar_persistence::types::QueryParams;
use geo::Geometry;
use serde_json::json;
use uuid::Uuid;

use common::{BOWTIE_GEOJSON, day, square, square_geojson};

fn no_polygons() -> HashMap<Uuid, Geometry<f64>> {
    HashMap::new()
}

async fn compile_records(params: &QueryParams) -> Result<Predicate, StorageError> {
    FilterChain::records(Some(JsonColumn::Data))
        .compile(params, &no_polygons())
        .await
}

fn filter_error(err: StorageError) -> FilterError {
    match err {
        StorageError::Filter(e) => e,
        other => panic!("expected a filter error, got {:?}", other),
    }
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_no_parameters_compiles_to_identity() {
    let predicate = compile_records(&QueryParams::new()).await.unwrap();
    assert_eq!(predicate, Predicate::All);
}

#[tokio::test]
async fn test_empty_geometry_parameters_are_identity() {
    let params = QueryParams::parse("polygon=&polygon_id=&jsonb=");
    assert_eq!(compile_records(&params).await.unwrap(), Predicate::All);
}

#[tokio::test]
async fn test_unrelated_parameters_are_ignored() {
    let params = QueryParams::parse("page=2&limit=50");
    assert_eq!(compile_records(&params).await.unwrap(), Predicate::All);
}

// ============================================================================
// Categorical
// ============================================================================

#[tokio::test]
async fn test_status_drops_unknown_tokens() {
    let params = QueryParams::parse("status=ERROR,WARNING,BOGUS");
    let predicate = FilterChain::boundaries()
        .compile(&params, &no_polygons())
        .await
        .unwrap();

    assert_eq!(
        predicate,
        Predicate::In {
            column: Column::Status,
            values: vec![
                ScalarValue::Text("WARNING".to_string()),
                ScalarValue::Text("ERROR".to_string()),
            ],
        }
    );
}

#[tokio::test]
async fn test_status_with_only_unknown_tokens_matches_nothing() {
    let params = QueryParams::parse("status=bogus");
    let predicate = FilterChain::boundaries()
        .compile(&params, &no_polygons())
        .await
        .unwrap();
    assert_eq!(
        predicate,
        Predicate::In {
            column: Column::Status,
            values: vec![],
        }
    );
}

#[tokio::test]
async fn test_record_type_must_be_uuid() {
    let params = QueryParams::new().with("record_type", "incident");
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert!(matches!(err, FilterError::InvalidIdentifier { .. }));
    assert_eq!(err.parameter(), Some("record_type"));
}

#[tokio::test]
async fn test_unparsable_archived_is_ignored() {
    let params = QueryParams::new().with("archived", "maybe");
    assert_eq!(compile_records(&params).await.unwrap(), Predicate::All);

    let params = QueryParams::new().with("archived", "false");
    assert_eq!(
        compile_records(&params).await.unwrap(),
        Predicate::Eq {
            column: Column::Archived,
            value: ScalarValue::Bool(false),
        }
    );
}

// ============================================================================
// Geometry
// ============================================================================

#[tokio::test]
async fn test_polygon_parameter_compiles_to_intersects() {
    let params = QueryParams::new().with("polygon", square_geojson(0.0, 0.0, 2.0));
    let predicate = compile_records(&params).await.unwrap();
    assert_eq!(
        predicate,
        Predicate::Intersects {
            column: Column::Geom,
            geometry: square(0.0, 0.0, 2.0),
        }
    );
}

#[tokio::test]
async fn test_self_intersecting_polygon_is_rejected() {
    let params = QueryParams::new().with("polygon", BOWTIE_GEOJSON);
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert!(matches!(err, FilterError::InvalidGeometry { ref parameter, .. } if parameter == "polygon"));
}

#[tokio::test]
async fn test_polygon_id_resolves_through_lookup() {
    let id = Uuid::new_v4();
    let polygons = HashMap::from([(id, square(5.0, 5.0, 1.0))]);
    let params = QueryParams::new().with("polygon_id", id.to_string());

    let predicate = FilterChain::records(Some(JsonColumn::Data))
        .compile(&params, &polygons)
        .await
        .unwrap();
    assert_eq!(
        predicate,
        Predicate::Intersects {
            column: Column::Geom,
            geometry: square(5.0, 5.0, 1.0),
        }
    );
}

#[tokio::test]
async fn test_unknown_polygon_id() {
    let id = Uuid::new_v4();
    let params = QueryParams::new().with("polygon_id", id.to_string());
    let err = compile_records(&params).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Filter(FilterError::PolygonNotFound { id: missing }) if missing == id
    ));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_malformed_polygon_id() {
    let params = QueryParams::new().with("polygon_id", "12");
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert!(matches!(err, FilterError::InvalidIdentifier { .. }));
}

// ============================================================================
// JSON containment
// ============================================================================

#[tokio::test]
async fn test_jsonb_object_compiles_to_contains() {
    let params = QueryParams::new().with("jsonb", r#"{"Site":{"name":"X"}}"#);
    assert_eq!(
        compile_records(&params).await.unwrap(),
        Predicate::Contains {
            column: JsonColumn::Data.column(),
            document: json!({"Site": {"name": "X"}}),
        }
    );
}

#[tokio::test]
async fn test_jsonb_array_is_type_mismatch() {
    let params = QueryParams::new().with("jsonb", "[1,2]");
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert!(matches!(err, FilterError::JsonTypeMismatch { ref found, .. } if found == "array"));
}

#[tokio::test]
async fn test_jsonb_garbage_is_invalid_json() {
    let params = QueryParams::new().with("jsonb", "not-json");
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert!(matches!(err, FilterError::InvalidJson { .. }));
}

#[tokio::test]
async fn test_unconfigured_jsonb_fails_even_without_parameter() {
    let err = FilterChain::records(None)
        .compile(&QueryParams::new(), &no_polygons())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Filter(FilterError::MisconfiguredFilter { .. })
    ));
    assert_eq!(err.status_code(), 500);
}

// ============================================================================
// Date range
// ============================================================================

#[tokio::test]
async fn test_occurred_min_only_uses_max_sentinel() {
    let params = QueryParams::new().with("occurred_min", "2020-01-01T00:00:00Z");
    assert_eq!(
        compile_records(&params).await.unwrap(),
        Predicate::Between {
            column: Column::OccurredFrom,
            min: day(2020, 1, 1),
            max: max_sentinel(),
        }
    );
}

#[tokio::test]
async fn test_occurred_max_only_uses_min_sentinel() {
    let params = QueryParams::new().with("occurred_max", "2020-01-01T05:00:00+05:00");
    assert_eq!(
        compile_records(&params).await.unwrap(),
        Predicate::Between {
            column: Column::OccurredFrom,
            min: min_sentinel(),
            max: day(2020, 1, 1),
        }
    );
}

#[tokio::test]
async fn test_naive_timestamp_is_missing_timezone() {
    let params = QueryParams::new().with("occurred_min", "2020-01-01T00:00:00");
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert_eq!(
        err,
        FilterError::MissingTimezone {
            parameter: "occurred_min".to_string()
        }
    );
}

#[tokio::test]
async fn test_unencoded_plus_offset_reports_timestamp_hint() {
    // A raw "+" in a query string decodes to a space.
    let params = QueryParams::parse("occurred_max=2020-01-01T00:00:00+05:00");
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert!(err.to_string().contains("properly encoded"));
}

// ============================================================================
// Composition
// ============================================================================

#[tokio::test]
async fn test_parameters_are_anded_in_chain_order() {
    let record_type = Uuid::new_v4();
    let params = QueryParams::new()
        .with("jsonb", r#"{"severity":"high"}"#)
        .with("record_type", record_type.to_string())
        .with("archived", "true");

    let predicate = compile_records(&params).await.unwrap();
    assert_eq!(
        predicate,
        Predicate::And(vec![
            Predicate::Eq {
                column: Column::RecordType,
                value: ScalarValue::Uuid(record_type),
            },
            Predicate::Eq {
                column: Column::Archived,
                value: ScalarValue::Bool(true),
            },
            Predicate::Contains {
                column: JsonColumn::Data.column(),
                document: json!({"severity": "high"}),
            },
        ])
    );
}

#[tokio::test]
async fn test_first_failing_parameter_wins() {
    let params = QueryParams::new()
        .with("record_type", "nope")
        .with("jsonb", "not-json");
    let err = filter_error(compile_records(&params).await.unwrap_err());
    assert_eq!(err.parameter(), Some("record_type"));
}
