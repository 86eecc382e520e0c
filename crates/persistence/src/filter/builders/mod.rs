//! Predicate builders, one per filter axis.
//!
//! Each builder reads its parameter(s) from a [`QueryParams`] and produces a
//! [`Predicate`]. Absent parameters yield [`Predicate::All`].

mod categorical;
mod date;
mod geometry;
mod json;

pub use categorical::{CategoricalMatch, CategoricalMode};
pub use date::{DateRange, OCCURRED_MAX, OCCURRED_MIN, max_sentinel, min_sentinel};
pub use geometry::{GeometryIntersect, GeometrySource};
pub use json::{JSONB_PARAMETER, JsonContainment};

use crate::core::PolygonLookup;
use crate::error::StorageResult;
use crate::filter::predicate::Predicate;
use crate::types::QueryParams;

/// A configured filter axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateBuilder {
    /// Identifier, status set, flag or text equality.
    CategoricalMatch(CategoricalMatch),
    /// Geometry intersection, inline or by reference.
    GeometryIntersect(GeometryIntersect),
    /// JSON document containment.
    JsonContainment(JsonContainment),
    /// Inclusive timestamp range.
    DateRange(DateRange),
}

impl PredicateBuilder {
    /// Builds this axis' predicate.
    ///
    /// Only the reference geometry mode touches `polygons`.
    pub async fn build(
        &self,
        params: &QueryParams,
        polygons: &dyn PolygonLookup,
    ) -> StorageResult<Predicate> {
        match self {
            PredicateBuilder::CategoricalMatch(builder) => Ok(builder.build(params)?),
            PredicateBuilder::GeometryIntersect(builder) => builder.build(params, polygons).await,
            PredicateBuilder::JsonContainment(builder) => Ok(builder.build(params)?),
            PredicateBuilder::DateRange(builder) => Ok(builder.build(params)?),
        }
    }

    /// Returns the parameters this builder reads.
    pub fn parameters(&self) -> Vec<&'static str> {
        match self {
            PredicateBuilder::CategoricalMatch(builder) => vec![builder.parameter()],
            PredicateBuilder::GeometryIntersect(builder) => vec![builder.parameter()],
            PredicateBuilder::JsonContainment(builder) => vec![builder.parameter()],
            PredicateBuilder::DateRange(builder) => builder.parameters().to_vec(),
        }
    }
}

impl From<CategoricalMatch> for PredicateBuilder {
    fn from(builder: CategoricalMatch) -> Self {
        PredicateBuilder::CategoricalMatch(builder)
    }
}

impl From<GeometryIntersect> for PredicateBuilder {
    fn from(builder: GeometryIntersect) -> Self {
        PredicateBuilder::GeometryIntersect(builder)
    }
}

impl From<JsonContainment> for PredicateBuilder {
    fn from(builder: JsonContainment) -> Self {
        PredicateBuilder::JsonContainment(builder)
    }
}

impl From<DateRange> for PredicateBuilder {
    fn from(builder: DateRange) -> Self {
        PredicateBuilder::DateRange(builder)
    }
}
