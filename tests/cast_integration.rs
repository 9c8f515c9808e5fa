//! Integration tests for the built-in field types.
//!
//! Every built-in type must cast its own textual form back to the same value.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use sift::prelude::*;
use uuid::Uuid;

fn cast(data_type: DataType, raw: &str) -> FilterValue {
    FieldTypeRegistry::builtin()
        .describe(&data_type)
        .unwrap()
        .cast(raw)
        .unwrap()
}

#[test]
fn test_integers_round_trip() {
    for value in [0_i64, 42, -17, i64::MAX, i64::MIN] {
        assert_eq!(cast(DataType::I64, &value.to_string()), FilterValue::Int(value));
    }
    for value in [i32::MAX, i32::MIN] {
        assert_eq!(cast(DataType::I32, &value.to_string()), FilterValue::Int(value as i64));
    }
}

#[test]
fn test_floats_and_decimals_round_trip() {
    for value in [0.5_f64, -1234.25, 1e-9] {
        assert_eq!(cast(DataType::F64, &value.to_string()), FilterValue::Float(value));
    }
    let decimal: Decimal = "1234.5600".parse().unwrap();
    assert_eq!(cast(DataType::Decimal, &decimal.to_string()), FilterValue::Decimal(decimal));
}

#[test]
fn test_text_round_trip() {
    assert_eq!(cast(DataType::Bool, &true.to_string()), FilterValue::Bool(true));
    assert_eq!(cast(DataType::Bool, &false.to_string()), FilterValue::Bool(false));
    assert_eq!(cast(DataType::Char, "é"), FilterValue::Char('é'));
    assert_eq!(cast(DataType::String, "  padded "), FilterValue::from("  padded "));
}

#[test]
fn test_uuid_round_trip() {
    let id = Uuid::new_v4();
    assert_eq!(cast(DataType::Uuid, &id.to_string()), FilterValue::Uuid(id));
    assert_eq!(cast(DataType::Uuid, &id.hyphenated().to_string().to_uppercase()), FilterValue::Uuid(id));
}

#[test]
fn test_temporal_round_trip() {
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    assert_eq!(cast(DataType::Date, &date.to_string()), FilterValue::Date(date));

    let time = NaiveTime::from_hms_milli_opt(23, 59, 58, 250).unwrap();
    assert_eq!(cast(DataType::Time, &time.to_string()), FilterValue::Time(time));

    let local = date.and_time(time);
    assert_eq!(cast(DataType::LocalDateTime, &local.to_string()), FilterValue::DateTime(local));

    let instant: DateTime<Utc> = "2024-03-01T08:15:30.5Z".parse().unwrap();
    assert_eq!(cast(DataType::Instant, &instant.to_rfc3339()), FilterValue::Timestamp(instant));

    let offset: DateTime<FixedOffset> = DateTime::parse_from_rfc3339("2024-03-01T10:15:30+05:30").unwrap();
    assert_eq!(
        cast(DataType::OffsetDateTime, &offset.to_rfc3339()),
        FilterValue::OffsetDateTime(offset)
    );
}

#[test]
fn test_zoned_values_carry_the_zone_offset() {
    let expected = DateTime::parse_from_rfc3339("2024-07-01T10:00:00+02:00").unwrap();
    assert_eq!(
        cast(DataType::ZonedDateTime, "2024-07-01T10:00:00[Europe/Paris]"),
        FilterValue::OffsetDateTime(expected)
    );
    assert_eq!(
        cast(DataType::ZonedDateTime, "2024-07-01T08:00:00Z[Europe/Paris]"),
        FilterValue::OffsetDateTime(expected)
    );
}

#[test]
fn test_malformed_values_are_rejected() {
    let registry = FieldTypeRegistry::builtin();
    for (data_type, raw) in [
        (DataType::I32, "12abc"),
        (DataType::Bool, "maybe"),
        (DataType::Uuid, "not-a-uuid"),
        (DataType::Date, "2024-02-30"),
        (DataType::Instant, "yesterday"),
        (DataType::ZonedDateTime, "2024-07-01T10:00:00[Mars/Olympus]"),
    ] {
        let descriptor = registry.describe(&data_type).unwrap();
        assert!(descriptor.cast(raw).is_err(), "{:?} accepted {:?}", data_type, raw);
    }
}
