//! SQLite backend implementation.
//!
//! This module implements every storage trait on top of an r2d2 pool of
//! rusqlite connections. It supports both in-memory databases (used by the
//! tests) and file-based databases.
//!
//! # Features
//!
//! - In-memory and file-based modes
//! - Filter pushdown: equality, in-set, flag and timestamp range conditions
//!   become SQL; geometry and JSON conditions are finished in-process
//! - Atomic schema publishing under `BEGIN IMMEDIATE`
//!
//! # Example
//!
//! ```no_run
//! use ashlar_persistence::backends::sqlite::SqliteBackend;
//! use ashlar_persistence::core::{RecordStorage, SchemaStorage};
//! use ashlar_persistence::types::RecordType;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("./data/ashlar.db")?;
//! backend.init_schema()?;
//!
//! let incident = backend
//!     .create_record_type(RecordType::new("Incident", "Incidents"))
//!     .await?;
//! let schema = backend
//!     .publish_schema(incident.uuid, json!({"type": "object"}))
//!     .await?;
//! assert_eq!(schema.version(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! Documents are stored as JSON text and geometries as GeoJSON text. Rows
//! with a geometry also carry its bounding box in `geom_min_x`, `geom_min_y`,
//! `geom_max_x` and `geom_max_y`. Timestamps are RFC 3339 UTC text with
//! microsecond precision, so text order is time order.
//!
//! ```sql
//! CREATE TABLE record_schemas (
//!     uuid TEXT PRIMARY KEY,
//!     record_type_id TEXT NOT NULL REFERENCES record_types(uuid),
//!     version INTEGER NOT NULL,
//!     schema TEXT NOT NULL,
//!     previous_version TEXT UNIQUE REFERENCES record_schemas(uuid) DEFERRABLE INITIALLY DEFERRED,
//!     next_version TEXT UNIQUE REFERENCES record_schemas(uuid) DEFERRABLE INITIALLY DEFERRED,
//!     created TEXT NOT NULL,
//!     modified TEXT NOT NULL,
//!     UNIQUE (record_type_id, version)
//! );
//!
//! -- at most one head per record type
//! CREATE UNIQUE INDEX idx_record_schemas_head
//!     ON record_schemas(record_type_id) WHERE next_version IS NULL;
//! ```

mod backend;
mod query_builder;
mod schema;
mod schema_chain;
mod storage;

pub use backend::{MEMORY_PATH, SqliteBackend, SqliteBackendConfig};
pub use query_builder::{PushdownQuery, QueryBuilder, SqlFragment, SqlParam};
pub use schema::SCHEMA_VERSION;
