//! Timestamp normalization.
//!
//! Every stored encoding is resolved to a single `DateTime<Utc>` before any
//! comparison happens. Resolution is total: a missing or unparseable value
//! becomes the caller's `now` and the record stays in the batch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::debug;

use crate::models::RawTimestamp;

// ---

/// Naive layouts accepted for text timestamps, interpreted as UTC.
const NAIVE_LAYOUTS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Resolve a stored timestamp to an instant, substituting `now` when the
/// value is missing or cannot be interpreted.
pub fn normalize_timestamp(raw: Option<&RawTimestamp>, now: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    let resolved = match raw {
        Some(RawTimestamp::Instant(instant)) => Some(*instant),
        // Sub-second part of the wrapper is dropped
        Some(RawTimestamp::Seconds { seconds, .. }) => DateTime::from_timestamp(*seconds, 0),
        Some(RawTimestamp::Millis(millis)) => from_epoch_millis(*millis),
        Some(RawTimestamp::Text(text)) => parse_text(text),
        Some(RawTimestamp::Unrecognized(_)) | None => None,
    };

    resolved.unwrap_or_else(|| {
        debug!("Unresolvable timestamp {:?}, substituting {}", raw, now);
        now
    })
}

fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    // ---
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    // ---
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(naive.and_utc());
        }
    }

    // Date-only strings mean midnight UTC
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}
