//! Per-source data shaping.
//!
//! Each adapter turns one source's raw payload into the slice of form state that source
//! owns. Adapters are pure; the reconciler decides when they run.

pub mod attributes;
pub mod death;
pub mod demographics;
pub mod encounters;
pub mod identifiers;
pub mod relationships;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse a REST or FHIR timestamp into wall-clock time at its own offset.
///
/// Accepts RFC 3339, the REST API's `+0000` offset form, offset-less date-times and bare
/// dates (midnight).
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
