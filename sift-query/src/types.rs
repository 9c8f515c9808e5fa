//! Common types shared across the pipeline: native data type tags and sort
//! specifications.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Cow;
use std::fmt;

/// Tag identifying the native type of a filterable field.
///
/// The built-in variants cover the scalar types entity attributes commonly
/// have. Applications register descriptors for additional types under
/// [`DataType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// `bool`.
    Bool,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Arbitrary precision fixed-point decimal.
    Decimal,
    /// Text.
    String,
    /// A single character.
    Char,
    /// Universally unique identifier.
    Uuid,
    /// Calendar date without time zone.
    Date,
    /// Wall-clock time without date or zone.
    Time,
    /// Date and time without zone.
    LocalDateTime,
    /// Absolute point in time (UTC).
    Instant,
    /// Date and time at a fixed UTC offset.
    OffsetDateTime,
    /// Date and time in a named time zone.
    ZonedDateTime,
    /// Application-defined type.
    Custom(SmolStr),
}

impl DataType {
    /// Temporal group of this type, if it is temporal.
    pub fn temporal_group(&self) -> Option<TemporalGroup> {
        match self {
            Self::Date => Some(TemporalGroup::Date),
            Self::Time => Some(TemporalGroup::Time),
            Self::LocalDateTime => Some(TemporalGroup::LocalDateTime),
            Self::Instant => Some(TemporalGroup::Instant),
            Self::OffsetDateTime | Self::ZonedDateTime => Some(TemporalGroup::Offset),
            _ => None,
        }
    }

    /// Short name used in error messages.
    pub fn name(&self) -> &str {
        match self {
            Self::Bool => "boolean",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Char => "char",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::Time => "time",
            Self::LocalDateTime => "local date-time",
            Self::Instant => "instant",
            Self::OffsetDateTime => "offset date-time",
            Self::ZonedDateTime => "zoned date-time",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Precision family of a temporal type.
///
/// Ordering comparisons over the `Offset` group go through a UTC-normalized
/// form so that values carrying different offsets compare by instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalGroup {
    /// Calendar dates.
    Date,
    /// Times of day.
    Time,
    /// Zone-less date-times.
    LocalDateTime,
    /// UTC instants.
    Instant,
    /// Offset or zoned date-times.
    Offset,
}

impl TemporalGroup {
    /// Whether the stored representation must be normalized before it can be
    /// ordered against other values of the group.
    pub fn needs_normalization(&self) -> bool {
        matches!(self, Self::Offset)
    }
}

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Order by specification for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column (or, before resolution, the field path) to order by.
    pub column: Cow<'static, str>,
    /// The sort order.
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<Cow<'static, str>>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Generate the SQL for this order by field.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(self.column.len() + 5);
        self.write_sql(&mut sql);
        sql
    }

    /// Write the SQL directly to a buffer.
    ///
    /// ```rust
    /// use sift_query::types::OrderByField;
    ///
    /// let field = OrderByField::desc("t0.created_at");
    /// let mut buffer = String::from("ORDER BY ");
    /// field.write_sql(&mut buffer);
    /// assert_eq!(buffer, "ORDER BY t0.created_at DESC");
    /// ```
    #[inline]
    pub fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&self.column);
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
    }
}

/// An ordered list of sort fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy {
    fields: Vec<OrderByField>,
}

impl OrderBy {
    /// Create an empty order by (no ordering).
    pub fn none() -> Self {
        Self::default()
    }

    /// Check if the order by is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Add a field to the order by.
    pub fn then(mut self, field: OrderByField) -> Self {
        self.fields.push(field);
        self
    }

    /// The fields, in priority order.
    pub fn fields(&self) -> &[OrderByField] {
        &self.fields
    }

    /// Generate the SQL ORDER BY clause (without the "ORDER BY" keyword).
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            field.write_sql(&mut sql);
        }
        sql
    }
}

impl From<Vec<OrderByField>> for OrderBy {
    fn from(fields: Vec<OrderByField>) -> Self {
        Self { fields }
    }
}

impl FromIterator<OrderByField> for OrderBy {
    fn from_iter<I: IntoIterator<Item = OrderByField>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
