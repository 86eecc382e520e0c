//! Renders compiled predicates into SQLite `WHERE` clauses.
//!
//! Equality, in-set, flag and range conditions are pushed down exactly.
//! Geometry intersection is pushed down as a bounding-box overlap test on the
//! `geom_*` columns and JSON containment is not pushed down at all; both are
//! finished in-process with [`Predicate::matches`].

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqlValue};

use crate::filter::{Predicate, ScalarValue};
use crate::types::geometry::bounding_box;

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, Default)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }
}

impl From<&ScalarValue> for SqlParam {
    fn from(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Uuid(id) => SqlParam::String(id.to_string()),
            ScalarValue::Text(text) => SqlParam::String(text.clone()),
            ScalarValue::Bool(flag) => SqlParam::Integer(i64::from(*flag)),
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::Owned(SqlValue::Text(s.clone())),
            SqlParam::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            SqlParam::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
        })
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter placeholder and returns the placeholder string.
    pub fn add_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// Appends a clause with AND.
    pub fn push_and(&mut self, clause: impl AsRef<str>) {
        let clause = clause.as_ref();
        if self.sql.is_empty() {
            self.sql = clause.to_string();
        } else {
            self.sql = format!("{} AND {}", self.sql, clause);
        }
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Renders as a `WHERE` clause, or nothing when empty.
    pub fn where_clause(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

/// Formats a timestamp the way timestamp columns store it.
///
/// Fixed-width UTC with microseconds, so text order is time order.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The SQL part of a predicate and whether rows still need checking.
#[derive(Debug, Clone, Default)]
pub struct PushdownQuery {
    /// Conditions rendered to SQL.
    pub filter: SqlFragment,
    /// True when candidate rows must be re-checked with
    /// [`Predicate::matches`].
    pub residual: bool,
}

/// Builds pushdown queries from predicates.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Splits a predicate into SQL and residual work.
    pub fn build(predicate: &Predicate) -> PushdownQuery {
        let mut query = PushdownQuery::default();
        for part in predicate.conjuncts() {
            if let Some(clause) = Self::build_condition(part, &mut query) {
                query.filter.push_and(clause);
            }
        }
        query
    }

    fn build_condition(predicate: &Predicate, query: &mut PushdownQuery) -> Option<String> {
        let filter = &mut query.filter;
        match predicate {
            Predicate::All => None,
            Predicate::Eq { column, value } => {
                let placeholder = filter.add_param(value.into());
                Some(format!("{} = {}", column, placeholder))
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return Some("0".to_string());
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| filter.add_param(value.into()))
                    .collect();
                Some(format!("{} IN ({})", column, placeholders.join(", ")))
            }
            Predicate::Between { column, min, max } => {
                let min = filter.add_param(SqlParam::string(format_timestamp(min)));
                let max = filter.add_param(SqlParam::string(format_timestamp(max)));
                Some(format!("{} BETWEEN {} AND {}", column, min, max))
            }
            Predicate::Intersects { column, geometry } => {
                query.residual = true;
                let Some((min_x, min_y, max_x, max_y)) = bounding_box(geometry) else {
                    // An empty operand intersects nothing.
                    return Some("0".to_string());
                };
                let filter = &mut query.filter;
                Some(format!(
                    "{col} IS NOT NULL AND {col}_min_x <= {} AND {col}_max_x >= {} \
                     AND {col}_min_y <= {} AND {col}_max_y >= {}",
                    filter.add_param(SqlParam::Float(max_x)),
                    filter.add_param(SqlParam::Float(min_x)),
                    filter.add_param(SqlParam::Float(max_y)),
                    filter.add_param(SqlParam::Float(min_y)),
                    col = column.name(),
                ))
            }
            Predicate::Contains { .. } => {
                query.residual = true;
                None
            }
            Predicate::And(parts) => {
                let clauses: Vec<String> = parts
                    .iter()
                    .filter_map(|part| Self::build_condition(part, query))
                    .collect();
                if clauses.is_empty() {
                    None
                } else {
                    Some(format!("({})", clauses.join(" AND ")))
                }
            }
        }
    }
}
