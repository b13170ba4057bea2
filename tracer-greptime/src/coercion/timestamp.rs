use crate::table::TimestampPrecision;
use chrono::{DateTime, Utc};
use span_structs::time_conversion::{epoch_zero, time_from_millis, time_from_nanos};
use span_structs::RawValue;

type TimestampParser = fn(&str, TimestampPrecision) -> Option<DateTime<Utc>>;

/// Tried in order on timestamp text, the first parser that succeeds wins:
/// 1. integer epoch offset, in the precision of the column
/// 2. RFC3339 with optional fractional seconds, `2023-11-14T22:13:20.5Z`
/// 3. `2023-11-14 22:13:20.5 +0000 UTC`, the zone abbreviation is ignored
const TEXT_PARSERS: [TimestampParser; 3] = [parse_epoch_offset, parse_rfc3339, parse_zoned_text];

pub fn parse_timestamp_text(text: &str, precision: TimestampPrecision) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    TEXT_PARSERS.iter().find_map(|parser| parser(text, precision))
}

fn from_epoch_offset(offset: i64, precision: TimestampPrecision) -> DateTime<Utc> {
    match precision {
        TimestampPrecision::Nanosecond => time_from_nanos(offset),
        TimestampPrecision::Millisecond => time_from_millis(offset),
    }
}

fn parse_epoch_offset(text: &str, precision: TimestampPrecision) -> Option<DateTime<Utc>> {
    text.parse::<i64>()
        .ok()
        .map(|offset| from_epoch_offset(offset, precision))
}

fn parse_rfc3339(text: &str, _precision: TimestampPrecision) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn parse_zoned_text(text: &str, _precision: TimestampPrecision) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = text.split_whitespace().take(3).collect();
    if parts.len() < 3 {
        return None;
    }
    DateTime::parse_from_str(&parts.join(" "), "%Y-%m-%d %H:%M:%S%.f %z")
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Never fails, anything unusable becomes epoch zero
pub fn coerce_timestamp(raw: Option<&RawValue>, precision: TimestampPrecision) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return epoch_zero();
    };
    let coerced = match raw {
        RawValue::Time(time) => Some(*time),
        RawValue::Int(offset) => Some(from_epoch_offset(*offset, precision)),
        RawValue::UInt(offset) => i64::try_from(*offset)
            .ok()
            .map(|offset| from_epoch_offset(offset, precision)),
        // saturating cast, NaN becomes 0
        RawValue::Float(offset) => Some(from_epoch_offset(*offset as i64, precision)),
        RawValue::Text(text) => parse_timestamp_text(text, precision),
        RawValue::Bool(_) | RawValue::Map(_) => None,
    };
    coerced.unwrap_or_else(epoch_zero)
}
