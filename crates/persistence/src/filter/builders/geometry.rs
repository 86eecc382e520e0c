//! Geometry intersection builder.

use crate::core::PolygonLookup;
use crate::error::{FilterError, StorageResult};
use crate::filter::params::ParameterValidator;
use crate::filter::predicate::{Column, Predicate};
use crate::types::QueryParams;

/// Where the intersection operand comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySource {
    /// A GeoJSON geometry given inline in the parameter.
    Direct,
    /// The identifier of a stored boundary polygon.
    ByReference,
}

/// Matches rows whose geometry intersects a polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryIntersect {
    parameter: &'static str,
    column: Column,
    source: GeometrySource,
}

impl GeometryIntersect {
    /// Inline GeoJSON operand, e.g. `polygon`.
    pub fn direct(parameter: &'static str, column: Column) -> Self {
        Self {
            parameter,
            column,
            source: GeometrySource::Direct,
        }
    }

    /// Stored polygon operand, e.g. `polygon_id`.
    pub fn by_reference(parameter: &'static str, column: Column) -> Self {
        Self {
            parameter,
            column,
            source: GeometrySource::ByReference,
        }
    }

    /// Returns the parameter this builder reads.
    pub fn parameter(&self) -> &'static str {
        self.parameter
    }

    /// Returns where the operand comes from.
    pub fn source(&self) -> GeometrySource {
        self.source
    }

    /// Builds the predicate. Absent or empty values yield the identity.
    ///
    /// In reference mode the polygon is resolved through `polygons`; both
    /// inline and stored geometries must pass the validity check.
    pub async fn build(
        &self,
        params: &QueryParams,
        polygons: &dyn PolygonLookup,
    ) -> StorageResult<Predicate> {
        let Some(raw) = params.get_non_empty(self.parameter) else {
            return Ok(Predicate::All);
        };

        let geometry = match self.source {
            GeometrySource::Direct => ParameterValidator::parse_geometry(self.parameter, raw)?,
            GeometrySource::ByReference => {
                let id = ParameterValidator::parse_identifier(self.parameter, raw)?;
                let stored = polygons
                    .polygon_geometry(id)
                    .await?
                    .ok_or(FilterError::PolygonNotFound { id })?;
                ParameterValidator::check_geometry(self.parameter, stored)?
            }
        };

        Ok(Predicate::Intersects {
            column: self.column,
            geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use geo::{Geometry, polygon};
    use std::collections::HashMap;
    use uuid::Uuid;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[0,0],[0,2],[2,2],[2,0],[0,0]]]}"#;

    #[tokio::test]
    async fn test_direct_polygon() {
        let builder = GeometryIntersect::direct("polygon", Column::Geom);
        let lookup: HashMap<Uuid, Geometry<f64>> = HashMap::new();
        let params = QueryParams::new().with("polygon", SQUARE);

        let predicate = builder.build(&params, &lookup).await.unwrap();
        assert!(matches!(predicate, Predicate::Intersects { column: Column::Geom, .. }));
    }

    #[tokio::test]
    async fn test_reference_resolves_stored_polygon() {
        let id = Uuid::new_v4();
        let square = Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0)]);
        let lookup = HashMap::from([(id, square.clone())]);
        let builder = GeometryIntersect::by_reference("polygon_id", Column::Geom);

        let predicate = builder
            .build(&QueryParams::new().with("polygon_id", id.to_string()), &lookup)
            .await
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::Intersects {
                column: Column::Geom,
                geometry: square,
            }
        );
    }

    #[tokio::test]
    async fn test_reference_unknown_polygon() {
        let lookup: HashMap<Uuid, Geometry<f64>> = HashMap::new();
        let builder = GeometryIntersect::by_reference("polygon_id", Column::Geom);
        let id = Uuid::new_v4();

        let err = builder
            .build(&QueryParams::new().with("polygon_id", id.to_string()), &lookup)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Filter(FilterError::PolygonNotFound { id: missing }) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_reference_rejects_invalid_stored_polygon() {
        let id = Uuid::new_v4();
        let bowtie = Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0), (x: 2.0, y: 0.0), (x: 0.0, y: 2.0)]);
        let lookup = HashMap::from([(id, bowtie)]);
        let builder = GeometryIntersect::by_reference("polygon_id", Column::Geom);

        let err = builder
            .build(&QueryParams::new().with("polygon_id", id.to_string()), &lookup)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Filter(FilterError::InvalidGeometry { ref parameter, .. }) if parameter == "polygon_id"
        ));
    }

    #[tokio::test]
    async fn test_reference_empty_is_identity() {
        let lookup: HashMap<Uuid, Geometry<f64>> = HashMap::new();
        let builder = GeometryIntersect::by_reference("polygon_id", Column::Geom);
        let predicate = builder
            .build(&QueryParams::parse("polygon_id="), &lookup)
            .await
            .unwrap();
        assert!(predicate.is_identity());
    }
}
