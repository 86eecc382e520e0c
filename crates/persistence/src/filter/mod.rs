//! The filter-compilation pipeline.
//!
//! Raw query parameters flow through three stages:
//!
//! 1. [`ParameterValidator`] parses one raw value into a typed value.
//! 2. A [`PredicateBuilder`] turns the typed value(s) of one axis into a
//!    [`Predicate`].
//! 3. A [`FilterChain`] runs the builders configured for a resource kind and
//!    ANDs the results.
//!
//! ```
//! # tokio_test_block(async {
//! use std::collections::HashMap;
//! use ashlar_persistence::filter::{FilterChain, Predicate};
//! use ashlar_persistence::types::QueryParams;
//!
//! let params = QueryParams::parse("status=ERROR,WARNING,BOGUS");
//! let polygons: HashMap<uuid::Uuid, geo::Geometry<f64>> = HashMap::new();
//! let predicate = FilterChain::boundaries().compile(&params, &polygons).await.unwrap();
//! assert!(matches!(predicate, Predicate::In { .. }));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

pub mod builders;
mod chain;
pub mod params;
pub mod predicate;

pub use builders::PredicateBuilder;
pub use chain::{FilterChain, ResourceKind};
pub use params::ParameterValidator;
pub use predicate::{Column, Filterable, JsonColumn, Predicate, ScalarValue, json_contains};
