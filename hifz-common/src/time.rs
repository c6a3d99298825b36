//! Timestamp and UTC-day utilities
//!
//! All scheduling arithmetic runs on UTC. Timestamps are persisted as
//! fixed-width RFC 3339 TEXT so that lexicographic ordering in SQLite matches
//! chronological ordering, which the event replay depends on.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage (fixed-width, millisecond precision, `Z`)
pub fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
pub fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Timestamp {
            value: s.to_string(),
            source: e,
        })
}

/// UTC day containing a timestamp
pub fn utc_day(ts: &DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Format a UTC day for storage (`YYYY-MM-DD`)
pub fn fmt_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a stored UTC day
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::Day {
        value: s.to_string(),
        source: e,
    })
}

/// Midnight UTC at the start of a day
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap())
}

/// Signed whole days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
