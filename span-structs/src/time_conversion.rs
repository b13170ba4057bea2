use chrono::{DateTime, TimeZone, Utc};

pub const NANOS_IN_1_MS: i64 = 1_000_000;

pub fn epoch_zero() -> DateTime<Utc> {
    Utc.timestamp_nanos(0)
}

// doesnt panic, every i64 of nanos fits a DateTime
pub fn time_from_nanos(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

// out of range millis map to epoch zero
pub fn time_from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(epoch_zero)
}

/// None after the year 2262 or before 1677
pub fn time_to_nanos(time: &DateTime<Utc>) -> Option<i64> {
    time.timestamp_nanos_opt()
}

pub fn time_to_millis(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub fn nanos_u64_to_i64(nanos: u64) -> i64 {
    i64::try_from(nanos).unwrap_or(i64::MAX)
}

#[test]
fn time_from_nanos_doesnt_panic() {
    println!("{}", time_from_nanos(i64::MAX));
    println!("{}", time_from_nanos(i64::MIN));
    println!("{}", time_from_millis(i64::MAX));
}

#[test]
fn nanos_round_trip_through_time() {
    let nanos = 1_700_000_000_123_456_789;
    assert_eq!(time_to_nanos(&time_from_nanos(nanos)), Some(nanos));
    assert_eq!(time_to_millis(&time_from_nanos(nanos)), nanos / NANOS_IN_1_MS);
    assert_eq!(time_to_nanos(&epoch_zero()), Some(0));
}
