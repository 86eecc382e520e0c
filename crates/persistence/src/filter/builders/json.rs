//! JSON document containment builder.

use crate::error::{FilterError, FilterResult};
use crate::filter::params::ParameterValidator;
use crate::filter::predicate::{JsonColumn, Predicate};
use crate::types::QueryParams;

/// Parameter carrying the containment document.
pub const JSONB_PARAMETER: &str = "jsonb";

/// Matches rows whose JSON column structurally contains the parameter
/// object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonContainment {
    parameter: &'static str,
    column: Option<JsonColumn>,
}

impl JsonContainment {
    /// Creates a builder targeting `column`.
    pub fn new(column: JsonColumn) -> Self {
        Self {
            parameter: JSONB_PARAMETER,
            column: Some(column),
        }
    }

    /// Creates a builder with no target column. Compiling it always fails.
    pub fn unconfigured() -> Self {
        Self {
            parameter: JSONB_PARAMETER,
            column: None,
        }
    }

    /// Returns the parameter this builder reads.
    pub fn parameter(&self) -> &'static str {
        self.parameter
    }

    /// Returns the configured column.
    pub fn column(&self) -> Option<JsonColumn> {
        self.column
    }

    /// Builds the predicate.
    ///
    /// The column configuration is checked before the parameter, so a
    /// misconfigured chain fails on every request.
    pub fn build(&self, params: &QueryParams) -> FilterResult<Predicate> {
        let column = self.column.ok_or_else(|| FilterError::MisconfiguredFilter {
            message: format!(
                "JSON containment on '{}' requires a target JSON column",
                self.parameter
            ),
        })?;

        let Some(raw) = params.get_non_empty(self.parameter) else {
            return Ok(Predicate::All);
        };
        let document = ParameterValidator::parse_json_object(self.parameter, raw)?;

        Ok(Predicate::Contains {
            column: column.column(),
            document,
        })
    }
}
