//! Calendar-date helpers shared by normalization, merging and scoring.
//!
//! Paper dates are stored as `YYYY-MM-DD` strings; an empty string means
//! unknown. Timestamps with an offset are converted to their UTC date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a date or timestamp. Returns `None` for empty or unrecognized input.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|ts| ts.date())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Normalize any supported timestamp to `YYYY-MM-DD`; invalid input gives `""`.
pub fn to_date_string(value: &str) -> String {
    parse_date(value).map(format_date).unwrap_or_default()
}

/// Whole days from `date` to `reference` (negative when `date` is later).
pub fn days_between(date: NaiveDate, reference: NaiveDate) -> i64 {
    (reference - date).num_days()
}
