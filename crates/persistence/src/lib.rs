//! Ashlar persistence layer.
//!
//! This crate stores geolocated records, their record types and versioned
//! JSON schemas, and uploaded boundary polygons. Its centre is the filter
//! pipeline that turns raw query parameters into typed predicates a backend
//! can execute.
//!
//! # Architecture
//!
//! - [`types`] - stored models and raw [`QueryParams`](types::QueryParams)
//! - [`filter`] - parameter validation, predicate builders and filter chains
//! - [`schema`] - JSON schema checks and the schema version chain
//! - [`core`] - storage traits and the [`FilteredSearch`] glue
//! - [`backends`] - backend implementations (SQLite)
//! - [`error`] - error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use ashlar_persistence::backends::sqlite::SqliteBackend;
//! use ashlar_persistence::core::{FilteredSearch, RecordStorage, SchemaStorage};
//! use ashlar_persistence::types::{QueryParams, Record, RecordType};
//! use chrono::Utc;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let incident = backend
//!     .create_record_type(RecordType::new("Incident", "Incidents"))
//!     .await?;
//! let schema = backend
//!     .publish_schema(incident.uuid, json!({"type": "object"}))
//!     .await?;
//! backend
//!     .create_record(Record::new(&schema, json!({"severity": "high"}), Utc::now()))
//!     .await?;
//!
//! let params = QueryParams::parse(r#"jsonb={"severity":"high"}&archived=false"#);
//! let records = backend.search_records(&params).await?;
//! assert_eq!(records.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod filter;
pub mod schema;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use filter::{FilterChain, Predicate};
pub use types::QueryParams;

// Re-export core traits
pub use core::{
    Backend, BackendKind, BoundaryStorage, FilteredSearch, PolygonLookup, RecordStorage,
    SchemaStorage,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
