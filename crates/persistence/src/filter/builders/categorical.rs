//! Exact-match builders over scalar columns.

use crate::error::FilterResult;
use crate::filter::params::ParameterValidator;
use crate::filter::predicate::{Column, Predicate, ScalarValue};
use crate::types::{BoundaryStatus, QueryParams};

/// How a categorical parameter value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalMode {
    /// A single UUID compared for equality.
    Identifier,
    /// A comma-separated list of boundary statuses.
    StatusSet,
    /// A boolean flag; unrecognised values are ignored.
    Flag,
    /// Free text compared for equality.
    Text,
}

/// Matches a scalar column against one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalMatch {
    parameter: &'static str,
    column: Column,
    mode: CategoricalMode,
}

impl CategoricalMatch {
    /// Creates a builder for `parameter` on `column`.
    pub fn new(parameter: &'static str, column: Column, mode: CategoricalMode) -> Self {
        Self {
            parameter,
            column,
            mode,
        }
    }

    /// UUID equality, e.g. `record_type` or `boundary`.
    pub fn identifier(parameter: &'static str, column: Column) -> Self {
        Self::new(parameter, column, CategoricalMode::Identifier)
    }

    /// In-set match against the boundary status domain.
    pub fn status_set(parameter: &'static str, column: Column) -> Self {
        Self::new(parameter, column, CategoricalMode::StatusSet)
    }

    /// Boolean flag equality, e.g. `archived`.
    pub fn flag(parameter: &'static str, column: Column) -> Self {
        Self::new(parameter, column, CategoricalMode::Flag)
    }

    /// Text equality, e.g. `label`.
    pub fn text(parameter: &'static str, column: Column) -> Self {
        Self::new(parameter, column, CategoricalMode::Text)
    }

    /// Returns the parameter this builder reads.
    pub fn parameter(&self) -> &'static str {
        self.parameter
    }

    /// Returns the interpretation mode.
    pub fn mode(&self) -> CategoricalMode {
        self.mode
    }

    /// Builds the predicate. Absent or empty values yield the identity.
    pub fn build(&self, params: &QueryParams) -> FilterResult<Predicate> {
        let Some(raw) = params.get_non_empty(self.parameter) else {
            return Ok(Predicate::All);
        };
        let column = self.column;

        let predicate = match self.mode {
            CategoricalMode::Identifier => Predicate::Eq {
                column,
                value: ScalarValue::Uuid(ParameterValidator::parse_identifier(
                    self.parameter,
                    raw,
                )?),
            },
            CategoricalMode::StatusSet => {
                // Unknown tokens are dropped; if none survive the set is empty.
                let mut statuses: Vec<BoundaryStatus> = raw
                    .split(',')
                    .filter_map(|token| token.trim().parse().ok())
                    .collect();
                statuses.sort();
                statuses.dedup();
                Predicate::In {
                    column,
                    values: statuses
                        .into_iter()
                        .map(|status| ScalarValue::Text(status.as_str().to_string()))
                        .collect(),
                }
            }
            CategoricalMode::Flag => match ParameterValidator::parse_bool(raw) {
                Some(flag) => Predicate::Eq {
                    column,
                    value: ScalarValue::Bool(flag),
                },
                None => Predicate::All,
            },
            CategoricalMode::Text => Predicate::Eq {
                column,
                value: ScalarValue::Text(raw.to_string()),
            },
        };
        Ok(predicate)
    }
}
