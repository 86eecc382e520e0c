//! Stored model types.
//!
//! These are the rows the filter layer reads: record types and their schema
//! versions, records, boundaries and boundary polygons.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use geo::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::geometry::{geojson_geometry, optional_geojson_geometry};

/// Current time at the precision timestamps are stored with.
pub(crate) fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A kind of record, e.g. "Incident". Owns a chain of schema versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
    /// Identity.
    pub uuid: Uuid,
    /// Display label.
    pub label: String,
    /// Plural display label.
    pub plural_label: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Whether the record type is offered for new records.
    pub active: bool,
    /// When the record type was created.
    pub created: DateTime<Utc>,
    /// When the record type was last modified.
    pub modified: DateTime<Utc>,
}

impl RecordType {
    /// Creates a new active record type with a fresh identity.
    pub fn new(label: impl Into<String>, plural_label: impl Into<String>) -> Self {
        let now = stored_now();
        Self {
            uuid: Uuid::new_v4(),
            label: label.into(),
            plural_label: plural_label.into(),
            description: None,
            active: true,
            created: now,
            modified: now,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// One published version of a record type's JSON schema.
///
/// Schema versions are created only by publishing through
/// [`SchemaStorage`](crate::core::SchemaStorage), which keeps the
/// `previous_version`/`next_version` pointers consistent. There is no public
/// constructor and no setter for the pointers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSchema {
    uuid: Uuid,
    record_type: Uuid,
    version: i64,
    schema: Value,
    previous_version: Option<Uuid>,
    next_version: Option<Uuid>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl RecordSchema {
    /// Rebuilds a schema version from stored columns.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_storage(
        uuid: Uuid,
        record_type: Uuid,
        version: i64,
        schema: Value,
        previous_version: Option<Uuid>,
        next_version: Option<Uuid>,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid,
            record_type,
            version,
            schema,
            previous_version,
            next_version,
            created,
            modified,
        }
    }

    /// Returns the identity of this version.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the record type this version belongs to.
    pub fn record_type(&self) -> Uuid {
        self.record_type
    }

    /// Returns the 1-based position of this version in its chain.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Returns the JSON schema document.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Returns the version this one superseded.
    pub fn previous_version(&self) -> Option<Uuid> {
        self.previous_version
    }

    /// Returns the version that superseded this one.
    pub fn next_version(&self) -> Option<Uuid> {
        self.next_version
    }

    /// Returns true if this is the current version of its record type.
    pub fn is_current(&self) -> bool {
        self.next_version.is_none()
    }

    /// Returns when this version was published.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Returns when this version's pointers last changed.
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
}

/// A geolocated record whose `data` follows the schema version it was
/// created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identity.
    pub uuid: Uuid,
    /// Record type of `schema`.
    pub record_type: Uuid,
    /// Schema version active when the record was created.
    pub schema: Uuid,
    /// Schema-free JSON document, object or array rooted.
    pub data: Value,
    /// Location, if known.
    #[serde(default, with = "optional_geojson_geometry")]
    pub geom: Option<Geometry<f64>>,
    /// When the recorded event started.
    pub occurred_from: DateTime<Utc>,
    /// When the recorded event ended.
    pub occurred_to: Option<DateTime<Utc>>,
    /// Archived records stay queryable but are hidden by default in clients.
    pub archived: bool,
    /// When the record was created.
    pub created: DateTime<Utc>,
    /// When the record was last modified.
    pub modified: DateTime<Utc>,
}

impl Record {
    /// Creates a new record against a published schema version.
    pub fn new(schema: &RecordSchema, data: Value, occurred_from: DateTime<Utc>) -> Self {
        let now = stored_now();
        Self {
            uuid: Uuid::new_v4(),
            record_type: schema.record_type(),
            schema: schema.uuid(),
            data,
            geom: None,
            occurred_from,
            occurred_to: None,
            archived: false,
            created: now,
            modified: now,
        }
    }

    /// Sets the location.
    pub fn with_geometry(mut self, geom: Geometry<f64>) -> Self {
        self.geom = Some(geom);
        self
    }

    /// Sets the end of the recorded event.
    pub fn with_occurred_to(mut self, occurred_to: DateTime<Utc>) -> Self {
        self.occurred_to = Some(occurred_to);
        self
    }

    /// Sets the archived flag.
    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }
}

/// Import status of a boundary upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryStatus {
    /// Uploaded, not yet processed.
    Pending,
    /// Import in progress.
    Processing,
    /// Imported with warnings.
    Warning,
    /// Import failed.
    Error,
    /// Imported successfully.
    Complete,
}

impl BoundaryStatus {
    /// Every legal status, in declaration order.
    pub const ALL: [BoundaryStatus; 5] = [
        BoundaryStatus::Pending,
        BoundaryStatus::Processing,
        BoundaryStatus::Warning,
        BoundaryStatus::Error,
        BoundaryStatus::Complete,
    ];

    /// Returns the stored token for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryStatus::Pending => "PENDING",
            BoundaryStatus::Processing => "PROCESSING",
            BoundaryStatus::Warning => "WARNING",
            BoundaryStatus::Error => "ERROR",
            BoundaryStatus::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for BoundaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryStatus {
    type Err = String;

    /// Parses the exact stored token; matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BoundaryStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown boundary status: {}", s))
    }
}

/// An uploaded set of polygons, e.g. administrative regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Identity.
    pub uuid: Uuid,
    /// Display label.
    pub label: String,
    /// Import status.
    pub status: BoundaryStatus,
    /// Import errors, if any.
    pub errors: Option<Value>,
    /// When the boundary was created.
    pub created: DateTime<Utc>,
    /// When the boundary was last modified.
    pub modified: DateTime<Utc>,
}

impl Boundary {
    /// Creates a new pending boundary.
    pub fn new(label: impl Into<String>) -> Self {
        let now = stored_now();
        Self {
            uuid: Uuid::new_v4(),
            label: label.into(),
            status: BoundaryStatus::Pending,
            errors: None,
            created: now,
            modified: now,
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: BoundaryStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the import errors.
    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// One polygon of a boundary, with its attribute document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPolygon {
    /// Identity.
    pub uuid: Uuid,
    /// Owning boundary.
    pub boundary: Uuid,
    /// Polygon geometry.
    #[serde(with = "geojson_geometry")]
    pub geom: Geometry<f64>,
    /// Attribute document, object or array rooted.
    pub data: Value,
    /// When the polygon was created.
    pub created: DateTime<Utc>,
    /// When the polygon was last modified.
    pub modified: DateTime<Utc>,
}

impl BoundaryPolygon {
    /// Creates a new polygon belonging to `boundary`.
    pub fn new(boundary: Uuid, geom: Geometry<f64>, data: Value) -> Self {
        let now = stored_now();
        Self {
            uuid: Uuid::new_v4(),
            boundary,
            geom,
            data,
            created: now,
            modified: now,
        }
    }
}
