//! Per-resource filter chains.

use std::fmt;

use tracing::debug;

use crate::core::PolygonLookup;
use crate::error::StorageResult;
use crate::filter::builders::{
    CategoricalMatch, DateRange, GeometryIntersect, JsonContainment, PredicateBuilder,
};
use crate::filter::predicate::{Column, JsonColumn, Predicate};
use crate::types::QueryParams;

/// The resource a chain filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Records.
    Record,
    /// Record types.
    RecordType,
    /// Boundaries.
    Boundary,
    /// Boundary polygons.
    BoundaryPolygon,
}

impl ResourceKind {
    /// Returns the resource name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Record => "Record",
            ResourceKind::RecordType => "RecordType",
            ResourceKind::Boundary => "Boundary",
            ResourceKind::BoundaryPolygon => "BoundaryPolygon",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered list of builders for one resource kind.
///
/// Compiling runs the builders in order and ANDs their results. The first
/// error aborts compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    kind: ResourceKind,
    builders: Vec<PredicateBuilder>,
}

impl FilterChain {
    /// Creates an empty chain, which always compiles to the identity.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            builders: Vec::new(),
        }
    }

    /// Appends a builder.
    pub fn with_builder(mut self, builder: impl Into<PredicateBuilder>) -> Self {
        self.builders.push(builder.into());
        self
    }

    /// The record chain: `record_type`, `archived`, `occurred_min`/`occurred_max`,
    /// `jsonb`, `polygon`, `polygon_id`.
    ///
    /// `json` selects the containment column; `None` leaves the `jsonb`
    /// filter unconfigured and every compile fails.
    pub fn records(json: Option<JsonColumn>) -> Self {
        Self::new(ResourceKind::Record)
            .with_builder(CategoricalMatch::identifier("record_type", Column::RecordType))
            .with_builder(CategoricalMatch::flag("archived", Column::Archived))
            .with_builder(DateRange::new(Column::OccurredFrom))
            .with_builder(json_builder(json))
            .with_builder(GeometryIntersect::direct("polygon", Column::Geom))
            .with_builder(GeometryIntersect::by_reference("polygon_id", Column::Geom))
    }

    /// The boundary chain: `status`.
    pub fn boundaries() -> Self {
        Self::new(ResourceKind::Boundary)
            .with_builder(CategoricalMatch::status_set("status", Column::Status))
    }

    /// The boundary polygon chain: `boundary`, `jsonb`.
    pub fn boundary_polygons(json: Option<JsonColumn>) -> Self {
        Self::new(ResourceKind::BoundaryPolygon)
            .with_builder(CategoricalMatch::identifier("boundary", Column::Boundary))
            .with_builder(json_builder(json))
    }

    /// The record type chain: `active`, `label`.
    pub fn record_types() -> Self {
        Self::new(ResourceKind::RecordType)
            .with_builder(CategoricalMatch::flag("active", Column::Active))
            .with_builder(CategoricalMatch::text("label", Column::Label))
    }

    /// Returns the resource kind this chain filters.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the configured builders, in order.
    pub fn builders(&self) -> &[PredicateBuilder] {
        &self.builders
    }

    /// Compiles `params` into one conjunctive predicate.
    pub async fn compile(
        &self,
        params: &QueryParams,
        polygons: &dyn PolygonLookup,
    ) -> StorageResult<Predicate> {
        let mut predicate = Predicate::All;
        for builder in &self.builders {
            predicate = predicate.and(builder.build(params, polygons).await?);
        }
        debug!(resource = %self.kind, predicate = %predicate, "Compiled filter chain");
        Ok(predicate)
    }
}

fn json_builder(json: Option<JsonColumn>) -> JsonContainment {
    match json {
        Some(column) => JsonContainment::new(column),
        None => JsonContainment::unconfigured(),
    }
}
