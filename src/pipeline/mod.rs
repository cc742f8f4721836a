//! Sensor aggregation and alerting core.
//!
//! Pure, synchronous functions over an already-fetched snapshot of readings:
//! - `window`: named period to concrete time window
//! - `normalize`: stored timestamp encodings to a single instant
//! - `filter`: type/window/location filtering and ordering
//! - `summary`: latest value and trend per sensor type
//! - `alerts`: threshold evaluation and alert list views
//! - `export`: CSV and JSON renderings
//!
//! Nothing here performs I/O; callers fetch, then aggregate, then persist.

pub mod alerts;
pub mod export;
pub mod filter;
pub mod normalize;
pub mod summary;
pub mod window;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{RawSensorReading, SensorReading, SensorType};

pub use alerts::{
    demo_alerts, evaluate_reading, evaluate_thresholds, select_alerts, unread_count, AlertView,
};
pub use export::{to_csv, to_json, ExportFormat, CSV_HEADER};
pub use filter::{collect_locations, filter_readings, sort_readings, ReadingFilter, SortOrder};
pub use normalize::normalize_timestamp;
pub use summary::{default_fallbacks, latest_per_type, round_tenth, summarize, TrendSummary};
pub use window::{resolve_window, Period, TimeWindow};

// ---

/// Everything a dashboard needs from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    // ---
    pub window: TimeWindow,
    /// Filtered readings, newest first.
    pub readings: Vec<SensorReading>,
    pub summaries: BTreeMap<SensorType, TrendSummary>,
    pub latest: BTreeMap<SensorType, SensorReading>,
    pub locations: BTreeSet<String>,
}

/// Run filter, summary and latest-per-type over one snapshot.
///
/// The requested sort order is ignored; summaries want newest first.
pub fn build_snapshot(
    raw: &[RawSensorReading],
    criteria: &ReadingFilter,
    fallbacks: &BTreeMap<SensorType, f64>,
    now: DateTime<Utc>,
) -> Snapshot {
    // ---
    let newest_first = criteria.clone().order(SortOrder::Descending);
    let readings = filter_readings(raw, &newest_first, now);

    Snapshot {
        window: criteria.window,
        summaries: summarize(&readings, &SensorType::ALL, fallbacks),
        latest: latest_per_type(&readings),
        locations: collect_locations(raw),
        readings,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::RawTimestamp;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_snapshot_end_to_end() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let reading = |id: &str, sensor_type, value, location: &str, age: i64| RawSensorReading {
            id: id.to_string(),
            sensor_id: None,
            sensor_type,
            value,
            unit: String::new(),
            location: location.to_string(),
            timestamp: Some(RawTimestamp::Millis(
                (now - Duration::minutes(age)).timestamp_millis() as f64,
            )),
            owner_id: "farm-1".to_string(),
        };

        let raw = vec![
            reading("t-old", SensorType::Temperature, 20.0, "Zone Nord", 60),
            reading("t-new", SensorType::Temperature, 23.0, "Zone Nord", 10),
            reading("h", SensorType::Humidity, 50.0, "Zone Sud", 20),
            reading("w-stale", SensorType::Water, 10.0, "Zone Est", 60 * 48),
        ];

        let window = resolve_window("day", None, None, now).unwrap();
        let criteria = ReadingFilter::new(window).location(Some("Zone Nord".to_string()));
        let snapshot = build_snapshot(&raw, &criteria, &default_fallbacks(), now);

        let ids: Vec<&str> = snapshot.readings.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t-new", "t-old"]);
        assert_eq!(snapshot.summaries[&SensorType::Temperature].trend, 3.0);
        assert_eq!(snapshot.summaries[&SensorType::Humidity].value, 68.0);
        assert_eq!(snapshot.latest.len(), 1);
        assert_eq!(snapshot.locations.len(), 3);
    }
}
