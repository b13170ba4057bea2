//! Turns whatever a span exposes for a field into the exact value its column expects.
//! Coercion can't fail: malformed or missing input degrades to the zero value of the
//! column type (epoch zero, 0 or an empty string) so one bad field never costs a span.

pub mod timestamp;

use crate::fields::catalog;
use crate::table::{ColumnType, ColumnValue, TimestampPrecision};
use span_structs::time_conversion::time_to_nanos;
use span_structs::RawValue;

pub use timestamp::{coerce_timestamp, parse_timestamp_text};

/// Pure and total, the returned value always fits `column_type`
pub fn coerce(source: &str, column_type: ColumnType, raw: Option<&RawValue>) -> ColumnValue {
    match column_type {
        ColumnType::TimestampNanosecond => {
            ColumnValue::Timestamp(coerce_timestamp(raw, TimestampPrecision::Nanosecond))
        }
        ColumnType::TimestampMillisecond => {
            ColumnValue::Timestamp(coerce_timestamp(raw, TimestampPrecision::Millisecond))
        }
        ColumnType::Int64 => ColumnValue::Int64(coerce_integer(raw)),
        ColumnType::String if catalog::is_structured(source) => {
            ColumnValue::String(coerce_structured(raw))
        }
        ColumnType::String => ColumnValue::String(render_text(raw)),
    }
}

pub fn coerce_integer(raw: Option<&RawValue>) -> i64 {
    let Some(raw) = raw else {
        return 0;
    };
    match raw {
        RawValue::Int(int) => *int,
        RawValue::UInt(uint) => i64::try_from(*uint).unwrap_or(i64::MAX),
        // saturating cast, NaN becomes 0
        RawValue::Float(float) => float.trunc() as i64,
        RawValue::Text(text) => text.trim().parse().unwrap_or(0),
        RawValue::Time(time) => time_to_nanos(time).unwrap_or(0),
        RawValue::Bool(_) | RawValue::Map(_) => 0,
    }
}

/// Maps become json text with sorted keys, anything else its plain rendering
pub fn coerce_structured(raw: Option<&RawValue>) -> String {
    match raw {
        Some(RawValue::Map(map)) => {
            serde_json::to_string(map).unwrap_or_else(|_| render_text(raw))
        }
        other => render_text(other),
    }
}

pub fn render_text(raw: Option<&RawValue>) -> String {
    raw.map(ToString::to_string).unwrap_or_default()
}
