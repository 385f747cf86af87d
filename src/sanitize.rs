//! Maps stored mailpiece documents to their caller-facing shape.
//!
//! Every tool runs its results through [`sanitize_mailpiece`] so the rules
//! live in one place:
//! - `mailpiece_id` and `delivery_scan_id` are dropped
//! - `scan_datetime` is rendered with [`crate::timestamp`]
//! - `forwarded`/`returned` become `"Yes"`/`"No"`
//! - `forwarded_address` survives only on forwarded scans

use mongodb::bson::{Bson, Document};
use serde_json::{Map, Number, Value};

use crate::timestamp::{format_timestamp_ms, format_timestamp_ms_f64, INVALID_DATE};

pub const MAILPIECE_ID: &str = "mailpiece_id";
pub const DELIVERY_SCAN_ID: &str = "delivery_scan_id";
pub const SCANS: &str = "scans";
pub const SCAN_DATETIME: &str = "scan_datetime";
pub const IS_FORWARDED: &str = "is_forwarded";
pub const IS_RETURNED: &str = "is_returned";
pub const FORWARDED_ADDRESS: &str = "forwarded_address";
pub const FORWARDED: &str = "forwarded";
pub const RETURNED: &str = "returned";

/// Sanitizes one stored mailpiece. Never fails; a missing or non-array
/// `scans` field becomes an empty array.
#[must_use]
pub fn sanitize_mailpiece(raw: &Document) -> Document {
    let mut out: Document = raw
        .iter()
        .filter(|(key, _)| key.as_str() != MAILPIECE_ID)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let scans: Vec<Bson> = match raw.get(SCANS) {
        Some(Bson::Array(items)) => items
            .iter()
            .map(|item| match item {
                Bson::Document(scan) => Bson::Document(sanitize_scan(scan)),
                _ => Bson::Document(sanitize_scan(&Document::new())),
            })
            .collect(),
        _ => Vec::new(),
    };
    out.insert(SCANS, scans);
    out
}

/// Sanitizes one embedded scan event.
#[must_use]
pub fn sanitize_scan(raw: &Document) -> Document {
    let mut out: Document = raw
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), DELIVERY_SCAN_ID | FORWARDED_ADDRESS))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if let Some(when) = raw.get(SCAN_DATETIME).filter(|v| is_truthy(v)) {
        out.insert(SCAN_DATETIME, format_scan_datetime(when));
    }

    let is_forwarded = raw.get(IS_FORWARDED).is_some_and(is_truthy);
    let is_returned = raw.get(IS_RETURNED).is_some_and(is_truthy);
    out.insert(FORWARDED, yes_no(is_forwarded));
    out.insert(RETURNED, yes_no(is_returned));

    if is_forwarded {
        if let Some(address) = raw.get(FORWARDED_ADDRESS).filter(|v| is_truthy(v)) {
            out.insert(FORWARDED_ADDRESS, address.clone());
        }
    }
    out
}

fn format_scan_datetime(value: &Bson) -> String {
    match value {
        Bson::Int64(ms) => format_timestamp_ms(*ms),
        Bson::Int32(ms) => format_timestamp_ms(i64::from(*ms)),
        Bson::Double(ms) => format_timestamp_ms_f64(*ms),
        Bson::DateTime(dt) => format_timestamp_ms(dt.timestamp_millis()),
        other => {
            tracing::warn!(value = %other, "scan_datetime is not a timestamp");
            INVALID_DATE.to_string()
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Loose truthiness of a stored value: null, `false`, zero, NaN and the
/// empty string are falsy.
#[must_use]
pub fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0 && !n.is_nan(),
        Bson::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Renders a sanitized document as plain JSON for the tool response.
#[must_use]
pub fn document_to_json(doc: &Document) -> Value {
    Value::Object(
        doc.iter()
            .map(|(key, value)| (key.clone(), bson_to_json(value)))
            .collect::<Map<String, Value>>(),
    )
}

// Largest integer a double holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Int32(n) => Value::from(*n),
        Bson::Int64(n) => Value::from(*n),
        Bson::Double(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            Value::from(*n as i64)
        }
        Bson::Double(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => document_to_json(doc),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => {
            let ms = dt.timestamp_millis();
            chrono::DateTime::from_timestamp_millis(ms).map_or(Value::from(ms), |utc| {
                Value::String(utc.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            })
        }
        other => other.clone().into_relaxed_extjson(),
    }
}
