//! Compiled filter predicates.
//!
//! A [`Predicate`] is the output of a [`FilterChain`](super::FilterChain):
//! a flat conjunction of conditions over named [`Column`]s. Backends render
//! the parts they can into their native query language and evaluate the rest
//! in-process with [`Predicate::matches`] against any [`Filterable`] row.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use geo::{Geometry, Intersects};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::types::geometry::to_geojson_string;
use crate::types::{Boundary, BoundaryPolygon, Record, RecordType};

/// A filterable column of a stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Record type foreign key of a record.
    RecordType,
    /// Archived flag of a record.
    Archived,
    /// Start of the recorded event.
    OccurredFrom,
    /// Geometry of a record or boundary polygon.
    Geom,
    /// JSON document of a record or boundary polygon.
    Data,
    /// Import status of a boundary.
    Status,
    /// Boundary foreign key of a boundary polygon.
    Boundary,
    /// Display label.
    Label,
    /// Active flag of a record type.
    Active,
}

impl Column {
    /// Returns the stored column name.
    pub fn name(&self) -> &'static str {
        match self {
            Column::RecordType => "record_type_id",
            Column::Archived => "archived",
            Column::OccurredFrom => "occurred_from",
            Column::Geom => "geom",
            Column::Data => "data",
            Column::Status => "status",
            Column::Boundary => "boundary_id",
            Column::Label => "label",
            Column::Active => "active",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JSON document column that containment filters can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonColumn {
    /// The `data` document.
    Data,
}

impl JsonColumn {
    /// Returns the underlying column.
    pub fn column(&self) -> Column {
        match self {
            JsonColumn::Data => Column::Data,
        }
    }
}

/// A scalar operand of an equality or in-set condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    /// An identifier.
    Uuid(Uuid),
    /// Free text or an enum token.
    Text(String),
    /// A flag.
    Bool(bool),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Uuid(id) => write!(f, "'{}'", id),
            ScalarValue::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            ScalarValue::Bool(flag) => write!(f, "{}", flag),
        }
    }
}

/// A boolean condition over stored rows, composable with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row. The identity of [`Predicate::and`].
    All,
    /// Column equals a value.
    Eq { column: Column, value: ScalarValue },
    /// Column is one of the values. An empty set matches nothing.
    In {
        column: Column,
        values: Vec<ScalarValue>,
    },
    /// Geometry column intersects the operand. Null geometries never match.
    Intersects {
        column: Column,
        geometry: Geometry<f64>,
    },
    /// JSON column contains the operand document (`@>` semantics).
    Contains { column: Column, document: Value },
    /// Timestamp column lies in `[min, max]`, both ends inclusive.
    Between {
        column: Column,
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    },
    /// Every child matches. Children are never `All` or `And`.
    And(Vec<Predicate>),
}

impl Predicate {
    /// Combines two predicates with AND, flattening nested conjunctions and
    /// dropping identities.
    pub fn and(self, other: Predicate) -> Predicate {
        let mut parts = self.into_conjuncts();
        parts.extend(other.into_conjuncts());
        match parts.len() {
            0 => Predicate::All,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    /// Returns true for the identity predicate.
    pub fn is_identity(&self) -> bool {
        matches!(self, Predicate::All)
    }

    /// Returns the top-level conjuncts. The identity has none.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::All => Vec::new(),
            Predicate::And(parts) => parts.iter().collect(),
            other => vec![other],
        }
    }

    fn into_conjuncts(self) -> Vec<Predicate> {
        match self {
            Predicate::All => Vec::new(),
            Predicate::And(parts) => parts,
            other => vec![other],
        }
    }

    /// Evaluates the predicate against a row.
    pub fn matches<F: Filterable + ?Sized>(&self, item: &F) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq { column, value } => item.scalar(*column).as_ref() == Some(value),
            Predicate::In { column, values } => item
                .scalar(*column)
                .is_some_and(|found| values.contains(&found)),
            Predicate::Intersects { column, geometry } => item
                .geometry(*column)
                .is_some_and(|stored| stored.intersects(geometry)),
            Predicate::Contains { column, document } => item
                .document(*column)
                .is_some_and(|stored| json_contains(stored, document)),
            Predicate::Between { column, min, max } => item
                .timestamp(*column)
                .is_some_and(|at| at >= *min && at <= *max),
            Predicate::And(parts) => parts.iter().all(|part| part.matches(item)),
        }
    }
}

fn format_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::All => write!(f, "TRUE"),
            Predicate::Eq { column, value } => write!(f, "{} = {}", column, value),
            Predicate::In { column, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN ({})", column, values.join(", "))
            }
            Predicate::Intersects { column, geometry } => {
                write!(f, "ST_Intersects({}, '{}')", column, to_geojson_string(geometry))
            }
            Predicate::Contains { column, document } => write!(f, "{} @> '{}'", column, document),
            Predicate::Between { column, min, max } => write!(
                f,
                "{} BETWEEN '{}' AND '{}'",
                column,
                format_instant(min),
                format_instant(max)
            ),
            Predicate::And(parts) => {
                let parts: Vec<String> = parts.iter().map(|part| format!("({})", part)).collect();
                write!(f, "{}", parts.join(" AND "))
            }
        }
    }
}

/// Structural containment of JSON documents.
///
/// Objects contain a filter object when every filter key is present and its
/// value is contained recursively. Arrays contain a filter array when every
/// filter element is contained in some stored element. Scalars must be
/// equal; numbers compare by numeric value.
pub fn json_contains(stored: &Value, filter: &Value) -> bool {
    match (stored, filter) {
        (Value::Object(stored), Value::Object(filter)) => filter.iter().all(|(key, wanted)| {
            stored
                .get(key)
                .is_some_and(|found| json_contains(found, wanted))
        }),
        (Value::Array(stored), Value::Array(filter)) => filter
            .iter()
            .all(|wanted| stored.iter().any(|found| json_contains(found, wanted))),
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (a, b) => a == b,
    }
}

/// Integers compare exactly; a float on either side compares as `f64`.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return a.as_f64() == b.as_f64();
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_u64().is_some_and(|x| b.as_u64() == Some(x)),
    }
}

/// A row that predicates can be evaluated against.
///
/// Each accessor returns `None` for columns the row does not have, or whose
/// value is null.
pub trait Filterable {
    /// Returns a scalar column value.
    fn scalar(&self, column: Column) -> Option<ScalarValue>;

    /// Returns a geometry column value.
    fn geometry(&self, _column: Column) -> Option<&Geometry<f64>> {
        None
    }

    /// Returns a JSON document column value.
    fn document(&self, _column: Column) -> Option<&Value> {
        None
    }

    /// Returns a timestamp column value.
    fn timestamp(&self, _column: Column) -> Option<DateTime<Utc>> {
        None
    }
}

impl Filterable for Record {
    fn scalar(&self, column: Column) -> Option<ScalarValue> {
        match column {
            Column::RecordType => Some(ScalarValue::Uuid(self.record_type)),
            Column::Archived => Some(ScalarValue::Bool(self.archived)),
            _ => None,
        }
    }

    fn geometry(&self, column: Column) -> Option<&Geometry<f64>> {
        match column {
            Column::Geom => self.geom.as_ref(),
            _ => None,
        }
    }

    fn document(&self, column: Column) -> Option<&Value> {
        match column {
            Column::Data => Some(&self.data),
            _ => None,
        }
    }

    fn timestamp(&self, column: Column) -> Option<DateTime<Utc>> {
        match column {
            Column::OccurredFrom => Some(self.occurred_from),
            _ => None,
        }
    }
}

impl Filterable for RecordType {
    fn scalar(&self, column: Column) -> Option<ScalarValue> {
        match column {
            Column::Label => Some(ScalarValue::Text(self.label.clone())),
            Column::Active => Some(ScalarValue::Bool(self.active)),
            _ => None,
        }
    }
}

impl Filterable for Boundary {
    fn scalar(&self, column: Column) -> Option<ScalarValue> {
        match column {
            Column::Status => Some(ScalarValue::Text(self.status.as_str().to_string())),
            Column::Label => Some(ScalarValue::Text(self.label.clone())),
            _ => None,
        }
    }
}

impl Filterable for BoundaryPolygon {
    fn scalar(&self, column: Column) -> Option<ScalarValue> {
        match column {
            Column::Boundary => Some(ScalarValue::Uuid(self.boundary)),
            _ => None,
        }
    }

    fn geometry(&self, column: Column) -> Option<&Geometry<f64>> {
        match column {
            Column::Geom => Some(&self.geom),
            _ => None,
        }
    }

    fn document(&self, column: Column) -> Option<&Value> {
        match column {
            Column::Data => Some(&self.data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, polygon};
    use serde_json::json;

    fn eq_type(id: Uuid) -> Predicate {
        Predicate::Eq {
            column: Column::RecordType,
            value: ScalarValue::Uuid(id),
        }
    }

    #[test]
    fn test_and_drops_identity_and_flattens() {
        let a = eq_type(Uuid::new_v4());
        let b = eq_type(Uuid::new_v4());
        let c = eq_type(Uuid::new_v4());

        assert_eq!(Predicate::All.and(Predicate::All), Predicate::All);
        assert_eq!(Predicate::All.and(a.clone()), a);
        let combined = a.clone().and(b.clone()).and(Predicate::All).and(c.clone());
        assert_eq!(combined, Predicate::And(vec![a, b, c]));
        assert_eq!(combined.conjuncts().len(), 3);
    }

    #[test]
    fn test_json_contains_objects() {
        let stored = json!({"Site": {"name": "X", "lanes": 2}, "Other": [1, 2, 3]});
        assert!(json_contains(&stored, &json!({})));
        assert!(json_contains(&stored, &json!({"Site": {"name": "X"}})));
        assert!(json_contains(&stored, &json!({"Site": {"lanes": 2.0}})));
        assert!(json_contains(&stored, &json!({"Other": [3, 1]})));
        assert!(!json_contains(&stored, &json!({"Site": {"name": "Y"}})));
        assert!(!json_contains(&stored, &json!({"Missing": null})));
        assert!(!json_contains(&stored, &json!({"Other": [4]})));
        assert!(!json_contains(&stored, &json!({"Site": "X"})));
    }

    #[test]
    fn test_json_contains_large_integers_compare_exactly() {
        let stored = json!({"count": 9007199254740993_u64, "offset": -9007199254740993_i64});
        assert!(json_contains(&stored, &json!({"count": 9007199254740993_u64})));
        assert!(!json_contains(&stored, &json!({"count": 9007199254740992_u64})));
        assert!(!json_contains(&stored, &json!({"offset": -9007199254740992_i64})));
        assert!(!json_contains(&json!({"n": u64::MAX}), &json!({"n": -1})));
    }

    #[test]
    fn test_json_contains_nested_arrays_of_objects() {
        let stored = json!({"people": [{"name": "a", "age": 3}, {"name": "b"}]});
        assert!(json_contains(&stored, &json!({"people": [{"name": "b"}]})));
        assert!(!json_contains(&stored, &json!({"people": [{"name": "c"}]})));
    }

    #[test]
    fn test_polygon_matches_by_intersection() {
        let polygon = BoundaryPolygon::new(
            Uuid::new_v4(),
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0)]),
            json!({"name": "unit"}),
        );
        let inside = Predicate::Intersects {
            column: Column::Geom,
            geometry: Geometry::Point(Point::new(0.5, 0.5)),
        };
        let outside = Predicate::Intersects {
            column: Column::Geom,
            geometry: Geometry::Point(Point::new(5.0, 5.0)),
        };
        assert!(inside.matches(&polygon));
        assert!(!outside.matches(&polygon));
    }

    #[test]
    fn test_empty_in_set_matches_nothing() {
        let boundary = Boundary::new("Districts");
        let none = Predicate::In {
            column: Column::Status,
            values: Vec::new(),
        };
        assert!(!none.matches(&boundary));
        assert!(Predicate::All.matches(&boundary));
    }

    #[test]
    fn test_display() {
        let predicate = Predicate::In {
            column: Column::Status,
            values: vec![
                ScalarValue::Text("ERROR".to_string()),
                ScalarValue::Text("WARNING".to_string()),
            ],
        }
        .and(Predicate::Eq {
            column: Column::Label,
            value: ScalarValue::Text("O'Hare".to_string()),
        });
        assert_eq!(
            predicate.to_string(),
            "(status IN ('ERROR', 'WARNING')) AND (label = 'O''Hare')"
        );
    }
}
