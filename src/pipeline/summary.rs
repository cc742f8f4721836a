//! Latest-value and trend summaries per sensor type.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{SensorReading, SensorType};

// ---

/// Latest value of a sensor type and its change from the previous reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSummary {
    pub value: f64,
    pub trend: f64,
}

/// Values shown for a sensor type with no reading in range.
pub fn default_fallbacks() -> BTreeMap<SensorType, f64> {
    // ---
    BTreeMap::from([
        (SensorType::Humidity, 68.0),
        (SensorType::Temperature, 24.0),
        (SensorType::Water, 85.0),
    ])
}

/// Round to one decimal, halves rounding up.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Summarize each requested sensor type.
///
/// `filtered` is expected newest-first; the order is re-established here with
/// a stable sort so an ascending input yields the same result. A type with no
/// reading gets its fallback (0 when none is supplied) and a zero trend.
pub fn summarize(
    filtered: &[SensorReading],
    sensor_types: &[SensorType],
    fallbacks: &BTreeMap<SensorType, f64>,
) -> BTreeMap<SensorType, TrendSummary> {
    // ---
    sensor_types
        .iter()
        .map(|&sensor_type| {
            let mut of_type: Vec<&SensorReading> = filtered
                .iter()
                .filter(|r| r.sensor_type == sensor_type)
                .collect();
            of_type.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

            let summary = match of_type.as_slice() {
                [] => TrendSummary {
                    value: fallbacks.get(&sensor_type).copied().unwrap_or_default(),
                    trend: 0.0,
                },
                [only] => TrendSummary {
                    value: only.value,
                    trend: 0.0,
                },
                [newest, previous, ..] => TrendSummary {
                    value: newest.value,
                    trend: round_tenth(newest.value - previous.value),
                },
            };
            (sensor_type, summary)
        })
        .collect()
}

/// Newest reading of every sensor type present; the first one wins a tie.
pub fn latest_per_type(filtered: &[SensorReading]) -> BTreeMap<SensorType, SensorReading> {
    // ---
    let mut latest: BTreeMap<SensorType, SensorReading> = BTreeMap::new();
    for reading in filtered {
        match latest.get(&reading.sensor_type) {
            Some(current) if current.timestamp >= reading.timestamp => {}
            _ => {
                latest.insert(reading.sensor_type, reading.clone());
            }
        }
    }
    latest
}
