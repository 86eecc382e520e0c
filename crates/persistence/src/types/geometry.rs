//! GeoJSON encoding and validity checks for stored and filter geometries.
//!
//! Geometries are held as [`geo::Geometry<f64>`] in memory and travel as
//! GeoJSON geometry objects everywhere else (query parameters, the SQLite
//! `geom` columns and serialized models).

use geo::{BoundingRect, Geometry, Validation};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Axis-aligned bounding box, `(min_x, min_y, max_x, max_y)`.
pub type BoundingBox = (f64, f64, f64, f64);

/// Decodes a GeoJSON geometry object into a geometry.
///
/// This only checks the encoding; use [`validity_reason`] to check the
/// resulting geometry.
pub fn from_geojson_str(text: &str) -> Result<Geometry<f64>, String> {
    let geometry: geojson::Geometry = serde_json::from_str(text).map_err(|e| e.to_string())?;
    Geometry::<f64>::try_from(geometry).map_err(|e| e.to_string())
}

/// Encodes a geometry as a GeoJSON geometry object.
pub fn to_geojson_string(geometry: &Geometry<f64>) -> String {
    let encoded = geojson::Geometry::new(geojson::Value::from(geometry));
    serde_json::to_string(&encoded).unwrap_or_default()
}

/// Returns why a geometry is invalid, or `None` when it is valid.
///
/// Multiple problems are joined with `"; "`.
pub fn validity_reason(geometry: &Geometry<f64>) -> Option<String> {
    let errors = geometry.validation_errors();
    if errors.is_empty() {
        None
    } else {
        Some(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Returns the bounding box of a geometry, if it has one.
pub fn bounding_box(geometry: &Geometry<f64>) -> Option<BoundingBox> {
    geometry.bounding_rect().map(|rect| {
        let (min, max) = (rect.min(), rect.max());
        (min.x, min.y, max.x, max.y)
    })
}

/// Serde adapter for a required geometry encoded as GeoJSON.
pub mod geojson_geometry {
    use super::*;

    /// Serializes a geometry as a GeoJSON geometry object.
    pub fn serialize<S: Serializer>(value: &Geometry<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        geojson::Geometry::new(geojson::Value::from(value)).serialize(serializer)
    }

    /// Deserializes a GeoJSON geometry object.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Geometry<f64>, D::Error> {
        let encoded = geojson::Geometry::deserialize(deserializer)?;
        Geometry::<f64>::try_from(encoded).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a nullable geometry encoded as GeoJSON.
pub mod optional_geojson_geometry {
    use super::*;

    /// Serializes a geometry as a GeoJSON geometry object, or `null`.
    pub fn serialize<S: Serializer>(
        value: &Option<Geometry<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(geometry) => {
                geojson::Geometry::new(geojson::Value::from(geometry)).serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes a GeoJSON geometry object or `null`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Geometry<f64>>, D::Error> {
        Option::<geojson::Geometry>::deserialize(deserializer)?
            .map(|encoded| Geometry::<f64>::try_from(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str =
        r#"{"type":"Polygon","coordinates":[[[0,0],[0,2],[2,2],[2,0],[0,0]]]}"#;
    const BOWTIE: &str =
        r#"{"type":"Polygon","coordinates":[[[0,0],[2,2],[2,0],[0,2],[0,0]]]}"#;

    #[test]
    fn test_decode_polygon() {
        let geometry = from_geojson_str(SQUARE).unwrap();
        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert_eq!(validity_reason(&geometry), None);
        assert_eq!(bounding_box(&geometry), Some((0.0, 0.0, 2.0, 2.0)));
    }

    #[test]
    fn test_self_intersecting_ring_is_invalid() {
        let geometry = from_geojson_str(BOWTIE).unwrap();
        assert!(validity_reason(&geometry).is_some());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(from_geojson_str("not geojson").is_err());
        assert!(from_geojson_str(r#"{"type":"Polygon"}"#).is_err());
    }

    #[test]
    fn test_encode_decode_point() {
        let geometry = Geometry::Point(geo::Point::new(1.5, -2.0));
        let text = to_geojson_string(&geometry);
        assert!(text.contains("\"Point\""));
        assert_eq!(from_geojson_str(&text).unwrap(), geometry);
    }
}
