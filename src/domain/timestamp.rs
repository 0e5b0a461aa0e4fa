//! Validity timestamps as they appear upstream and in canonical features.

use serde_json::Value;
use time::{
    OffsetDateTime, PrimitiveDateTime,
    format_description::well_known::{Iso8601, Rfc3339},
    macros::format_description,
};

/// Interpret an upstream validity value.
///
/// Numbers are Unix seconds; strings are ISO 8601 date-times (UTC when no offset is
/// given) or `YYYY-MM-DD HH:MM:SS` in UTC.
/// Null, empty, zero and unparseable values yield `None`.
pub fn from_upstream(value: Option<&Value>) -> Option<OffsetDateTime> {
    match value? {
        Value::Number(number) => {
            let seconds = number.as_f64().filter(|s| s.is_finite() && *s != 0.0)?;
            from_unix_millis(seconds * 1000.0)
        }
        Value::String(text) => parse(text),
        _ => None,
    }
}

/// Canonical RFC 3339 rendering of an upstream validity value.
pub fn canonical(value: Option<&Value>) -> Option<String> {
    from_upstream(value).and_then(|instant| instant.format(&Rfc3339).ok())
}

/// Parse a timestamp string.
///
/// Accepts RFC 3339, then general ISO 8601 date-times (reduced precision and
/// fractional seconds included), then the space-separated form. A missing offset
/// means UTC.
pub fn parse(text: &str) -> Option<OffsetDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    OffsetDateTime::parse(trimmed, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(trimmed, &Iso8601::DEFAULT))
        .ok()
        .or_else(|| {
            PrimitiveDateTime::parse(trimmed, &Iso8601::DEFAULT)
                .or_else(|_| {
                    PrimitiveDateTime::parse(
                        trimmed,
                        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
                    )
                })
                .ok()
                .map(PrimitiveDateTime::assume_utc)
        })
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis(instant: OffsetDateTime) -> f64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as f64
}

fn from_unix_millis(millis: f64) -> Option<OffsetDateTime> {
    let nanos = (millis as i128).checked_mul(1_000_000)?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}
