//! The field-type registry.
//!
//! Each [`DataType`] maps to a [`FieldTypeDescriptor`]: the set of operators
//! that make sense for the type, and a caster turning a raw filter string into
//! a typed [`FilterValue`].
//!
//! The registry is assembled once at startup and is read-only afterwards;
//! share it behind an `Arc`.
//!
//! ```rust
//! use sift_query::field_type::{FieldTypeDescriptor, FieldTypeRegistry};
//! use sift_query::filter::FilterValue;
//! use sift_query::operator::{Operator, OperatorSet};
//! use sift_query::types::DataType;
//!
//! let registry = FieldTypeRegistry::builder()
//!     .register(FieldTypeDescriptor::new(
//!         DataType::Custom("cents".into()),
//!         OperatorSet::COMPARABLE,
//!         |raw| sift_query::field_type::cast_i64(raw),
//!     ))
//!     .build();
//!
//! let cents = registry.describe(&DataType::Custom("cents".into())).unwrap();
//! assert!(cents.supports(Operator::Between));
//! assert_eq!(cents.cast("150").unwrap(), FilterValue::Int(150));
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::FilterValue;
use crate::operator::{Operator, OperatorSet};
use crate::types::DataType;

/// A raw value that could not be cast into a field's type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CastError {
    /// The value is not a literal of the expected type.
    #[error("`{value}` is not a valid {expected}")]
    Invalid {
        /// The raw input.
        value: String,
        /// Name of the expected type.
        expected: String,
    },
    /// The value parsed but does not fit the type.
    #[error("`{value}` is out of range for {expected}")]
    OutOfRange {
        /// The raw input.
        value: String,
        /// Name of the expected type.
        expected: String,
    },
    /// The local date-time does not exist in the requested zone.
    #[error("`{value}` does not exist in time zone {zone}")]
    NonexistentLocalTime {
        /// The raw input.
        value: String,
        /// The zone name.
        zone: String,
    },
}

impl CastError {
    /// Shorthand for [`CastError::Invalid`].
    pub fn invalid(value: &str, expected: impl Into<String>) -> Self {
        Self::Invalid {
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

/// Casts a raw string into a typed value.
pub type CastFn = Arc<dyn Fn(&str) -> Result<FilterValue, CastError> + Send + Sync>;

/// Operator support and casting for one native type.
#[derive(Clone)]
pub struct FieldTypeDescriptor {
    data_type: DataType,
    operators: OperatorSet,
    caster: CastFn,
}

impl FieldTypeDescriptor {
    /// Create a descriptor.
    pub fn new<F>(data_type: DataType, operators: OperatorSet, caster: F) -> Self
    where
        F: Fn(&str) -> Result<FilterValue, CastError> + Send + Sync + 'static,
    {
        Self {
            data_type,
            operators,
            caster: Arc::new(caster),
        }
    }

    /// The type this descriptor handles.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Operators valid for this type.
    pub fn operators(&self) -> OperatorSet {
        self.operators
    }

    /// Check whether an operator is valid for this type.
    pub fn supports(&self, op: Operator) -> bool {
        self.operators.contains(op)
    }

    /// Cast a raw value.
    ///
    /// Surrounding whitespace is trimmed for every type except `String`, and a
    /// blank input casts to [`FilterValue::Null`] for those types.
    pub fn cast(&self, raw: &str) -> Result<FilterValue, CastError> {
        if self.data_type == DataType::String {
            return (self.caster)(raw);
        }
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(FilterValue::Null);
        }
        (self.caster)(trimmed)
    }
}

impl fmt::Debug for FieldTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTypeDescriptor")
            .field("data_type", &self.data_type)
            .field("operators", &self.operators)
            .finish_non_exhaustive()
    }
}

/// Immutable lookup from data type to descriptor.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    descriptors: HashMap<DataType, FieldTypeDescriptor>,
}

impl FieldTypeRegistry {
    /// A registry holding the built-in descriptors.
    pub fn builtin() -> Self {
        Self::builder().build()
    }

    /// Start from the built-in descriptors.
    pub fn builder() -> FieldTypeRegistryBuilder {
        FieldTypeRegistryBuilder {
            descriptors: builtin_descriptors()
                .into_iter()
                .map(|d| (d.data_type.clone(), d))
                .collect(),
        }
    }

    /// Start from nothing.
    pub fn empty_builder() -> FieldTypeRegistryBuilder {
        FieldTypeRegistryBuilder {
            descriptors: HashMap::new(),
        }
    }

    /// Look up the descriptor for a type.
    pub fn describe(&self, data_type: &DataType) -> Option<&FieldTypeDescriptor> {
        self.descriptors.get(data_type)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Setup-time builder for [`FieldTypeRegistry`].
pub struct FieldTypeRegistryBuilder {
    descriptors: HashMap<DataType, FieldTypeDescriptor>,
}

impl FieldTypeRegistryBuilder {
    /// Register a descriptor, replacing any existing one for the same type.
    pub fn register(mut self, descriptor: FieldTypeDescriptor) -> Self {
        self.descriptors.insert(descriptor.data_type.clone(), descriptor);
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> FieldTypeRegistry {
        FieldTypeRegistry {
            descriptors: self.descriptors,
        }
    }
}

fn builtin_descriptors() -> Vec<FieldTypeDescriptor> {
    vec![
        FieldTypeDescriptor::new(DataType::Bool, OperatorSet::EQUALITY, cast_bool),
        FieldTypeDescriptor::new(DataType::I16, OperatorSet::COMPARABLE, |raw| {
            parse_int::<i16>(raw, "i16").map(|v| FilterValue::Int(v as i64))
        }),
        FieldTypeDescriptor::new(DataType::I32, OperatorSet::COMPARABLE, |raw| {
            parse_int::<i32>(raw, "i32").map(|v| FilterValue::Int(v as i64))
        }),
        FieldTypeDescriptor::new(DataType::I64, OperatorSet::COMPARABLE, cast_i64),
        FieldTypeDescriptor::new(DataType::F32, OperatorSet::COMPARABLE, |raw| {
            parse_float::<f32>(raw, "f32").map(|v| FilterValue::Float(v as f64))
        }),
        FieldTypeDescriptor::new(DataType::F64, OperatorSet::COMPARABLE, |raw| {
            parse_float::<f64>(raw, "f64").map(FilterValue::Float)
        }),
        FieldTypeDescriptor::new(DataType::Decimal, OperatorSet::COMPARABLE, |raw| {
            Decimal::from_str(raw)
                .map(FilterValue::Decimal)
                .map_err(|_| CastError::invalid(raw, "decimal"))
        }),
        FieldTypeDescriptor::new(DataType::String, OperatorSet::TEXT, |raw| {
            Ok(FilterValue::String(raw.to_string()))
        }),
        FieldTypeDescriptor::new(DataType::Char, OperatorSet::TEXT, |raw| {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(FilterValue::Char(c)),
                _ => Err(CastError::invalid(raw, "char")),
            }
        }),
        FieldTypeDescriptor::new(DataType::Uuid, OperatorSet::EQUALITY, |raw| {
            Uuid::parse_str(raw)
                .map(FilterValue::Uuid)
                .map_err(|_| CastError::invalid(raw, "uuid"))
        }),
        FieldTypeDescriptor::new(DataType::Date, OperatorSet::COMPARABLE, |raw| {
            NaiveDate::from_str(raw)
                .map(FilterValue::Date)
                .map_err(|_| CastError::invalid(raw, "date (YYYY-MM-DD)"))
        }),
        FieldTypeDescriptor::new(DataType::Time, OperatorSet::COMPARABLE, |raw| {
            NaiveTime::from_str(raw)
                .map(FilterValue::Time)
                .map_err(|_| CastError::invalid(raw, "time (HH:MM:SS)"))
        }),
        FieldTypeDescriptor::new(DataType::LocalDateTime, OperatorSet::COMPARABLE, |raw| {
            parse_local_date_time(raw)
                .map(FilterValue::DateTime)
                .ok_or_else(|| CastError::invalid(raw, "local date-time (YYYY-MM-DDTHH:MM:SS)"))
        }),
        FieldTypeDescriptor::new(DataType::Instant, OperatorSet::COMPARABLE, |raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| FilterValue::Timestamp(dt.with_timezone(&Utc)))
                .map_err(|_| CastError::invalid(raw, "instant (RFC 3339)"))
        }),
        FieldTypeDescriptor::new(DataType::OffsetDateTime, OperatorSet::COMPARABLE, |raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(FilterValue::OffsetDateTime)
                .map_err(|_| CastError::invalid(raw, "offset date-time (RFC 3339)"))
        }),
        FieldTypeDescriptor::new(DataType::ZonedDateTime, OperatorSet::COMPARABLE, cast_zoned),
    ]
}

/// Caster for 64-bit integers, usable by custom descriptors.
pub fn cast_i64(raw: &str) -> Result<FilterValue, CastError> {
    parse_int::<i64>(raw, "i64").map(FilterValue::Int)
}

/// Caster for booleans: `true`/`false`/`1`/`0`, ignoring case.
pub fn cast_bool(raw: &str) -> Result<FilterValue, CastError> {
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Ok(FilterValue::Bool(true))
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Ok(FilterValue::Bool(false))
    } else {
        Err(CastError::invalid(raw, "boolean"))
    }
}

fn parse_int<T>(raw: &str, expected: &str) -> Result<T, CastError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    use std::num::IntErrorKind;

    raw.parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => CastError::OutOfRange {
            value: raw.to_string(),
            expected: expected.to_string(),
        },
        _ => CastError::invalid(raw, expected),
    })
}

fn parse_float<T>(raw: &str, expected: &str) -> Result<T, CastError>
where
    T: FromStr + Into<f64> + Copy,
{
    match raw.parse::<T>() {
        Ok(v) if v.into().is_finite() => Ok(v),
        Ok(_) => Err(CastError::OutOfRange {
            value: raw.to_string(),
            expected: expected.to_string(),
        }),
        Err(_) => Err(CastError::invalid(raw, expected)),
    }
}

fn parse_local_date_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::from_str(raw)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
}

/// Zoned date-times: `2024-03-01T10:00:00+01:00[Europe/Paris]`,
/// `2024-03-01T10:00:00[Europe/Paris]`, or plain RFC 3339.
fn cast_zoned(raw: &str) -> Result<FilterValue, CastError> {
    let expected = "zoned date-time";
    let Some((date_time, zone)) = raw.strip_suffix(']').and_then(|s| s.split_once('[')) else {
        return DateTime::parse_from_rfc3339(raw)
            .map(FilterValue::OffsetDateTime)
            .map_err(|_| CastError::invalid(raw, expected));
    };

    let tz: Tz = zone.parse().map_err(|_| CastError::invalid(raw, expected))?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(date_time) {
        return Ok(FilterValue::OffsetDateTime(dt.with_timezone(&tz).fixed_offset()));
    }

    let local = parse_local_date_time(date_time).ok_or_else(|| CastError::invalid(raw, expected))?;
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| FilterValue::OffsetDateTime(dt.fixed_offset()))
        .ok_or_else(|| CastError::NonexistentLocalTime {
            value: raw.to_string(),
            zone: zone.to_string(),
        })
}
