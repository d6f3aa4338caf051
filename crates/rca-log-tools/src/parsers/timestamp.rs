//! Timestamp normalization to `DateTime<Utc>`.

use chrono::{DateTime, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a timestamp string into UTC.
///
/// Accepts RFC 3339, ISO-like datetimes without an offset (assumed UTC,
/// `T` or space separated, `.` or `,` fractions) and epoch seconds.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // log4j-style "12:00:05,250"
    let normalized = s.replacen(',', ".", 1);
    let s = normalized.as_str();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // "+0000" style offsets are not RFC 3339
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }

    s.parse::<f64>().ok().and_then(from_epoch_secs)
}

/// Epoch seconds (fractional allowed) to UTC.
pub fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = (secs.fract() * 1e9).round() as u32;
    DateTime::from_timestamp(whole, nanos.min(999_999_999))
}
