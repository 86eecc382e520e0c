//! Core types for the persistence layer.
//!
//! - [`RecordType`], [`RecordSchema`], [`Record`] - record types, their schema
//!   versions and the records created against them
//! - [`Boundary`], [`BoundaryPolygon`], [`BoundaryStatus`] - uploaded boundary
//!   sets and their polygons
//! - [`QueryParams`] - raw query parameters fed to the filter chains
//! - [`geometry`] - GeoJSON codec and validity checks
//!
//! # Examples
//!
//! ```
//! use ashlar_persistence::types::{Boundary, BoundaryStatus, QueryParams};
//!
//! let boundary = Boundary::new("Districts").with_status(BoundaryStatus::Complete);
//! assert_eq!(boundary.status.as_str(), "COMPLETE");
//!
//! let params = QueryParams::parse("status=COMPLETE%2CWARNING");
//! assert_eq!(params.get("status"), Some("COMPLETE,WARNING"));
//! ```

pub mod geometry;
mod models;
mod query_params;

pub use models::{Boundary, BoundaryPolygon, BoundaryStatus, Record, RecordSchema, RecordType};
pub use query_params::QueryParams;

pub(crate) use models::stored_now;
