//! Time bucketing utilities for progress aggregation
//!
//! Sessions are bucketed by *local* calendar day ("YYYY-MM-DD"), since streaks
//! and daily totals follow the user's calendar rather than UTC.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Local calendar day of a UTC instant
pub fn local_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// Day bucket string ("YYYY-MM-DD") for a UTC instant
pub fn day_bucket(ts: DateTime<Utc>) -> String {
    local_day(ts).format("%Y-%m-%d").to_string()
}

/// Day bucket string from a Unix timestamp in milliseconds
pub fn day_bucket_ms(timestamp_ms: i64) -> String {
    let dt = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now);
    day_bucket(dt)
}

/// Parse a day bucket string back into a date
pub fn parse_day_bucket(bucket: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(bucket, "%Y-%m-%d").ok()
}
