//! The predicate tree produced by the builder.
//!
//! [`Filter`] is a small relational predicate algebra: comparisons against
//! [`Expr`] column handles, combined with AND / OR / NOT. It renders to
//! parameterised SQL via [`Filter::to_sql`].
//!
//! ```rust
//! use sift_query::filter::{Expr, Filter, FilterValue};
//! use sift_query::types::DataType;
//!
//! let age = Expr::new("t0", "age", DataType::I32);
//! let name = Expr::new("t0", "name", DataType::String);
//!
//! let filter = Filter::and([
//!     Filter::Gt(age, FilterValue::Int(18)),
//!     Filter::Contains(name.upper(), "acme".into()),
//! ]);
//!
//! let (sql, params) = filter.to_sql(0);
//! assert_eq!(sql, "(t0.age > $1 AND UPPER(t0.name) LIKE UPPER($2) ESCAPE '\\')");
//! assert_eq!(params.len(), 2);
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use smol_str::SmolStr;
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

use crate::types::{DataType, TemporalGroup};

/// A typed value a raw filter string was cast into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null (absent) value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value (every integer width).
    Int(i64),
    /// Float value (every float width).
    Float(f64),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// Text value.
    String(String),
    /// Single character.
    Char(char),
    /// UUID.
    Uuid(Uuid),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Zone-less date-time.
    DateTime(NaiveDateTime),
    /// UTC instant.
    Timestamp(DateTime<Utc>),
    /// Date-time at a fixed offset (also used for zoned values).
    OffsetDateTime(DateTime<FixedOffset>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text payload, if this is a text value.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(s) => Some(Cow::Borrowed(s)),
            Self::Char(c) => Some(Cow::Owned(c.to_string())),
            _ => None,
        }
    }

    /// Normalize offset date-times to UTC instants; other values are unchanged.
    pub fn into_utc(self) -> Self {
        match self {
            Self::OffsetDateTime(dt) => Self::Timestamp(dt.with_timezone(&Utc)),
            other => other,
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A function wrapped around a column before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Upper-case text, for case-insensitive matching.
    Upper,
    /// Normalize an offset/zoned timestamp column to UTC.
    Utc,
}

/// A typed handle to a column reachable from the root entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr {
    /// Table alias the column belongs to (empty for unqualified columns).
    pub source: SmolStr,
    /// Column name.
    pub column: SmolStr,
    /// Native type of the column.
    pub data_type: DataType,
    /// Optional function applied to the column.
    pub transform: Option<Transform>,
}

impl Expr {
    /// A column qualified by a table alias.
    pub fn new(source: impl Into<SmolStr>, column: impl Into<SmolStr>, data_type: DataType) -> Self {
        Self {
            source: source.into(),
            column: column.into(),
            data_type,
            transform: None,
        }
    }

    /// An unqualified column.
    pub fn column(column: impl Into<SmolStr>, data_type: DataType) -> Self {
        Self::new("", column, data_type)
    }

    /// Upper-case this expression.
    pub fn upper(mut self) -> Self {
        self.transform = Some(Transform::Upper);
        self
    }

    /// Temporal group of the column type.
    pub fn temporal_group(&self) -> Option<TemporalGroup> {
        self.data_type.temporal_group()
    }

    /// The form of this expression that ordering comparisons must use.
    ///
    /// Offset and zoned columns are wrapped in a UTC conversion; everything
    /// else is returned unchanged.
    pub fn comparable(&self) -> Self {
        match self.temporal_group() {
            Some(group) if group.needs_normalization() => {
                let mut expr = self.clone();
                expr.transform = Some(Transform::Utc);
                expr
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qualified = if self.source.is_empty() {
            Cow::Borrowed(self.column.as_str())
        } else {
            Cow::Owned(format!("{}.{}", self.source, self.column))
        };
        match self.transform {
            None => f.write_str(&qualified),
            Some(Transform::Upper) => write!(f, "UPPER({})", qualified),
            Some(Transform::Utc) => write!(f, "({} AT TIME ZONE 'UTC')", qualified),
        }
    }
}

/// A complete filter that can be converted to SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(Expr, FilterValue),
    /// Not equals comparison.
    NotEquals(Expr, FilterValue),

    /// Less than comparison.
    Lt(Expr, FilterValue),
    /// Less than or equal comparison.
    Lte(Expr, FilterValue),
    /// Greater than comparison.
    Gt(Expr, FilterValue),
    /// Greater than or equal comparison.
    Gte(Expr, FilterValue),

    /// In a list of values.
    In(Expr, Vec<FilterValue>),
    /// Not in a list of values.
    NotIn(Expr, Vec<FilterValue>),

    /// Inside an inclusive range.
    Between(Expr, FilterValue, FilterValue),

    /// Contains (LIKE %value%).
    Contains(Expr, String),
    /// Starts with (LIKE value%).
    StartsWith(Expr, String),
    /// Ends with (LIKE %value).
    EndsWith(Expr, String),

    /// Is null check.
    IsNull(Expr),
    /// Is not null check.
    IsNotNull(Expr),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter. Empty members are dropped.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.pop().unwrap_or_default(),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter. Empty members are dropped.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.pop().unwrap_or_default(),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another filter using OR.
    pub fn or_else(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            _ => Self::Or(vec![self, other]),
        }
    }

    /// Generate SQL for this filter with parameter placeholders.
    /// Returns (sql, params) where params are the values to bind.
    /// Placeholders are numbered from `param_offset + 1`.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let mut sql = String::new();
        self.write_sql(param_offset, &mut sql, &mut params);
        (sql, params)
    }

    fn write_sql(&self, offset: usize, sql: &mut String, params: &mut Vec<FilterValue>) {
        let bind = |value: FilterValue, params: &mut Vec<FilterValue>| -> String {
            params.push(value);
            format!("${}", offset + params.len())
        };

        match self {
            Self::None => sql.push_str("TRUE"),

            Self::Equals(expr, val) if val.is_null() => sql.push_str(&format!("{} IS NULL", expr)),
            Self::Equals(expr, val) => {
                let p = bind(val.clone(), params);
                sql.push_str(&format!("{} = {}", expr, p));
            }
            Self::NotEquals(expr, val) if val.is_null() => {
                sql.push_str(&format!("{} IS NOT NULL", expr))
            }
            Self::NotEquals(expr, val) => {
                let p = bind(val.clone(), params);
                sql.push_str(&format!("{} != {}", expr, p));
            }

            Self::Lt(expr, val) => {
                let p = bind(val.clone(), params);
                sql.push_str(&format!("{} < {}", expr, p));
            }
            Self::Lte(expr, val) => {
                let p = bind(val.clone(), params);
                sql.push_str(&format!("{} <= {}", expr, p));
            }
            Self::Gt(expr, val) => {
                let p = bind(val.clone(), params);
                sql.push_str(&format!("{} > {}", expr, p));
            }
            Self::Gte(expr, val) => {
                let p = bind(val.clone(), params);
                sql.push_str(&format!("{} >= {}", expr, p));
            }

            Self::In(_, values) if values.is_empty() => sql.push_str("FALSE"),
            Self::NotIn(_, values) if values.is_empty() => sql.push_str("TRUE"),
            Self::In(expr, values) | Self::NotIn(expr, values) => {
                let placeholders: Vec<_> = values.iter().map(|v| bind(v.clone(), params)).collect();
                let keyword = if matches!(self, Self::In(..)) { "IN" } else { "NOT IN" };
                sql.push_str(&format!("{} {} ({})", expr, keyword, placeholders.join(", ")));
            }

            Self::Between(expr, low, high) => {
                let lo = bind(low.clone(), params);
                let hi = bind(high.clone(), params);
                sql.push_str(&format!("{} BETWEEN {} AND {}", expr, lo, hi));
            }

            Self::Contains(expr, s) | Self::StartsWith(expr, s) | Self::EndsWith(expr, s) => {
                let escaped = escape_like(s);
                let pattern = match self {
                    Self::Contains(..) => format!("%{}%", escaped),
                    Self::StartsWith(..) => format!("{}%", escaped),
                    _ => format!("%{}", escaped),
                };
                let p = bind(FilterValue::String(pattern), params);
                // Upper-cased columns get the same SQL function on the pattern.
                if expr.transform == Some(Transform::Upper) {
                    sql.push_str(&format!("{} LIKE UPPER({}) ESCAPE '\\'", expr, p));
                } else {
                    sql.push_str(&format!("{} LIKE {} ESCAPE '\\'", expr, p));
                }
            }

            Self::IsNull(expr) => sql.push_str(&format!("{} IS NULL", expr)),
            Self::IsNotNull(expr) => sql.push_str(&format!("{} IS NOT NULL", expr)),

            Self::And(filters) | Self::Or(filters) => {
                let (empty, joiner) = if matches!(self, Self::And(_)) {
                    ("TRUE", " AND ")
                } else {
                    ("FALSE", " OR ")
                };
                if filters.is_empty() {
                    sql.push_str(empty);
                    return;
                }
                sql.push('(');
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(joiner);
                    }
                    filter.write_sql(offset, sql, params);
                }
                sql.push(')');
            }
            Self::Not(filter) => {
                sql.push_str("NOT (");
                filter.write_sql(offset, sql, params);
                sql.push(')');
            }
        }
    }
}

/// Escape LIKE wildcards so the value matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
