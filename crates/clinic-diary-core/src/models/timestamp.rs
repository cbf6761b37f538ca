//! Timestamp helpers shared by the store and the editor.
//!
//! Timestamps are persisted as fixed-width RFC 3339 strings with millisecond
//! precision (`2024-03-05T10:30:00.000Z`) so that lexical order in SQLite
//! matches chronological order.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};

/// Format a timestamp in the canonical stored form.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the canonical stored form.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Parse a stored timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

/// Parse the value of a date input.
///
/// Accepts a bare calendar date (`YYYY-MM-DD`, taken as midnight at
/// `offset`, the same offset search day bounds use) or a full RFC 3339
/// timestamp. Blank input clears the date.
pub fn parse_date_input(
    raw: &str,
    offset: FixedOffset,
) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => {
            let local_midnight = date.and_time(NaiveTime::MIN).and_utc();
            Ok(Some(local_midnight - Duration::seconds(offset.local_minus_utc().into())))
        }
        Err(_) => parse_timestamp(raw).map(Some),
    }
}
