//! Scan timestamp formatting.

use chrono::{DateTime, Datelike};

/// Returned whenever a timestamp cannot be turned into a calendar date.
pub const INVALID_DATE: &str = "Invalid date";

/// Formats epoch milliseconds as `MM/DD/YYYY hh:mm:ss AM/PM` in UTC.
///
/// Hours use the 12-hour clock, so both midnight and noon render as `12`.
/// Out-of-range values yield [`INVALID_DATE`] instead of an error.
#[must_use]
pub fn format_timestamp_ms(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) if (0..=9999).contains(&dt.year()) => {
            dt.format("%m/%d/%Y %I:%M:%S %p").to_string()
        }
        Some(_) | None => {
            tracing::warn!(ms, "timestamp out of formattable range");
            INVALID_DATE.to_string()
        }
    }
}

/// Same as [`format_timestamp_ms`] for floating-point millisecond values,
/// which are truncated toward zero.
#[must_use]
pub fn format_timestamp_ms_f64(ms: f64) -> String {
    // i64::MAX as f64 rounds up, so the upper bound is exclusive.
    if !ms.is_finite() || ms >= i64::MAX as f64 || ms < i64::MIN as f64 {
        tracing::warn!(ms, "timestamp is not a finite integer");
        return INVALID_DATE.to_string();
    }
    format_timestamp_ms(ms.trunc() as i64)
}
