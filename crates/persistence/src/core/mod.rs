//! Core storage traits and abstractions.
//!
//! - [`Backend`] - backend lifecycle (health check, schema initialization)
//! - [`PolygonLookup`] - the polygon-by-reference collaborator of the filter
//!   chains
//! - [`RecordStorage`], [`BoundaryStorage`] - inserts, reads and
//!   predicate-driven finders
//! - [`SchemaStorage`] - the schema version chain
//! - [`FilteredSearch`] - query-string search on top of the above
//!
//! ```text
//! PolygonLookup ─┐
//! RecordStorage ─┼── FilteredSearch
//! BoundaryStorage┘
//!
//! SchemaStorage (independent)
//! ```

pub mod backend;
pub mod search;
pub mod storage;

pub use backend::{Backend, BackendKind};
pub use search::FilteredSearch;
pub use storage::{BoundaryStorage, PolygonLookup, RecordStorage, SchemaStorage};
