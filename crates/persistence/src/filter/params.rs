//! Typed parsing of raw query parameter values.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use geo::Geometry;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FilterError, FilterResult};
use crate::types::geometry::{from_geojson_str, validity_reason};

/// Date-time formats with an explicit offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// Date-time formats without an offset. Matching one of these means the
/// value was a timestamp that lacked its timezone.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses and type-checks raw parameter values.
///
/// Every failure names the parameter it was raised for.
pub struct ParameterValidator;

impl ParameterValidator {
    /// Parses a UUID. A well-formed but unknown identifier is not an error
    /// here.
    pub fn parse_identifier(parameter: &str, raw: &str) -> FilterResult<Uuid> {
        Uuid::parse_str(raw.trim()).map_err(|e| FilterError::InvalidIdentifier {
            parameter: parameter.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        })
    }

    /// Decodes a GeoJSON geometry object and checks that it is valid.
    pub fn parse_geometry(parameter: &str, raw: &str) -> FilterResult<Geometry<f64>> {
        let geometry = from_geojson_str(raw).map_err(|reason| FilterError::InvalidGeometry {
            parameter: parameter.to_string(),
            reason,
        })?;
        Self::check_geometry(parameter, geometry)
    }

    /// Checks that an already decoded geometry is valid.
    pub fn check_geometry(parameter: &str, geometry: Geometry<f64>) -> FilterResult<Geometry<f64>> {
        match validity_reason(&geometry) {
            None => Ok(geometry),
            Some(reason) => Err(FilterError::InvalidGeometry {
                parameter: parameter.to_string(),
                reason,
            }),
        }
    }

    /// Parses an ISO 8601 timestamp that carries a UTC offset.
    ///
    /// Values that parse as a naive date or date-time fail with
    /// [`FilterError::MissingTimezone`]; anything else that does not parse
    /// fails with [`FilterError::InvalidTimestamp`].
    pub fn parse_timestamp(parameter: &str, raw: &str) -> FilterResult<DateTime<FixedOffset>> {
        let text = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Ok(parsed);
        }

        let normalized = match text.strip_suffix(['Z', 'z']) {
            Some(rest) => format!("{}+00:00", rest),
            None => text.to_string(),
        };
        for format in OFFSET_FORMATS {
            if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
                return Ok(parsed);
            }
        }

        let naive = NAIVE_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
            || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok();
        if naive {
            Err(FilterError::MissingTimezone {
                parameter: parameter.to_string(),
            })
        } else {
            Err(FilterError::InvalidTimestamp {
                parameter: parameter.to_string(),
            })
        }
    }

    /// Parses JSON text of any type.
    pub fn parse_json(parameter: &str, raw: &str) -> FilterResult<Value> {
        serde_json::from_str(raw).map_err(|e| FilterError::InvalidJson {
            parameter: parameter.to_string(),
            message: e.to_string(),
        })
    }

    /// Parses JSON text that must be an object.
    pub fn parse_json_object(parameter: &str, raw: &str) -> FilterResult<Value> {
        let value = Self::parse_json(parameter, raw)?;
        if value.is_object() {
            Ok(value)
        } else {
            Err(FilterError::JsonTypeMismatch {
                parameter: parameter.to_string(),
                found: json_type_name(&value).to_string(),
            })
        }
    }

    /// Parses a boolean flag. Unrecognised text yields `None`.
    pub fn parse_bool(raw: &str) -> Option<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
