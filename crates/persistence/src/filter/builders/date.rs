//! Timestamp range builder.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::FilterResult;
use crate::filter::params::ParameterValidator;
use crate::filter::predicate::{Column, Predicate};
use crate::types::QueryParams;

/// Parameter carrying the lower bound.
pub const OCCURRED_MIN: &str = "occurred_min";
/// Parameter carrying the upper bound.
pub const OCCURRED_MAX: &str = "occurred_max";

/// Lower bound used when only the maximum is given: 1901-01-01T00:00:00Z.
pub fn min_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1901, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Upper bound used when only the minimum is given:
/// 9999-12-31T23:59:59.999999Z.
pub fn max_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .and_then(|at| at.checked_add_signed(chrono::Duration::microseconds(999_999)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Matches rows whose timestamp lies between two optional bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    min_parameter: &'static str,
    max_parameter: &'static str,
    column: Column,
}

impl DateRange {
    /// Creates a builder over `column` using the `occurred_min` and
    /// `occurred_max` parameters.
    pub fn new(column: Column) -> Self {
        Self {
            min_parameter: OCCURRED_MIN,
            max_parameter: OCCURRED_MAX,
            column,
        }
    }

    /// Returns the two parameters this builder reads, minimum first.
    pub fn parameters(&self) -> [&'static str; 2] {
        [self.min_parameter, self.max_parameter]
    }

    /// Builds an inclusive `BETWEEN` predicate.
    ///
    /// With neither parameter present the result is the identity. A present
    /// parameter is parsed even when empty. The minimum is checked first.
    pub fn build(&self, params: &QueryParams) -> FilterResult<Predicate> {
        let min = params.get(self.min_parameter);
        let max = params.get(self.max_parameter);
        if min.is_none() && max.is_none() {
            return Ok(Predicate::All);
        }

        let min = match min {
            Some(raw) => ParameterValidator::parse_timestamp(self.min_parameter, raw)?
                .with_timezone(&Utc),
            None => min_sentinel(),
        };
        let max = match max {
            Some(raw) => ParameterValidator::parse_timestamp(self.max_parameter, raw)?
                .with_timezone(&Utc),
            None => max_sentinel(),
        };

        Ok(Predicate::Between {
            column: self.column,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;

    #[test]
    fn test_sentinels() {
        assert_eq!(min_sentinel().to_rfc3339(), "1901-01-01T00:00:00+00:00");
        assert_eq!(
            max_sentinel().to_rfc3339(),
            "9999-12-31T23:59:59.999999+00:00"
        );
    }

    #[test]
    fn test_min_only_uses_max_sentinel() {
        let builder = DateRange::new(Column::OccurredFrom);
        let params = QueryParams::new().with(OCCURRED_MIN, "2020-01-01T00:00:00+00:00");
        let predicate = builder.build(&params).unwrap();
        assert_eq!(
            predicate,
            Predicate::Between {
                column: Column::OccurredFrom,
                min: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
                max: max_sentinel(),
            }
        );
    }

    #[test]
    fn test_absent_is_identity() {
        let builder = DateRange::new(Column::OccurredFrom);
        assert!(builder.build(&QueryParams::new()).unwrap().is_identity());
    }

    #[test]
    fn test_minimum_checked_first() {
        let builder = DateRange::new(Column::OccurredFrom);
        let params = QueryParams::new()
            .with(OCCURRED_MIN, "garbage")
            .with(OCCURRED_MAX, "2020-01-01T00:00:00");
        let err = builder.build(&params).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidTimestamp {
                parameter: OCCURRED_MIN.to_string()
            }
        );

        let params = QueryParams::new().with(OCCURRED_MAX, "2020-01-01T00:00:00");
        let err = builder.build(&params).unwrap_err();
        assert_eq!(
            err,
            FilterError::MissingTimezone {
                parameter: OCCURRED_MAX.to_string()
            }
        );
    }
}
