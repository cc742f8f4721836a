//! Normalization, filtering and ordering of reading snapshots.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::models::{RawSensorReading, SensorReading, SensorType};
use crate::pipeline::window::TimeWindow;

// ---

/// Chronological order for charts, newest-first for summaries and tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SortOrder {
    // ---
    #[default]
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

/// Conjunctive criteria applied to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingFilter {
    // ---
    pub sensor_type: Option<SensorType>,
    pub location: Option<String>,
    pub window: TimeWindow,
    pub order: SortOrder,
}

impl ReadingFilter {
    // ---
    pub fn new(window: TimeWindow) -> Self {
        // ---
        Self {
            sensor_type: None,
            location: None,
            window,
            order: SortOrder::default(),
        }
    }

    pub fn sensor_type(mut self, sensor_type: Option<SensorType>) -> Self {
        self.sensor_type = sensor_type;
        self
    }

    pub fn location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    fn matches_type(&self, sensor_type: SensorType) -> bool {
        self.sensor_type.map_or(true, |t| t == sensor_type)
    }

    fn matches_location(&self, location: &str) -> bool {
        self.location.as_deref().map_or(true, |l| l == location)
    }
}

/// Normalize and filter a raw snapshot.
///
/// Filters run in order: sensor type, window containment, location. A record
/// is only ever excluded by one of those three; an unresolvable timestamp is
/// taken as `now`. Output is ordered per `criteria.order`, ties keeping their
/// input order.
pub fn filter_readings(
    raw: &[RawSensorReading],
    criteria: &ReadingFilter,
    now: DateTime<Utc>,
) -> Vec<SensorReading> {
    // ---
    let mut selected: Vec<SensorReading> = raw
        .iter()
        .filter(|r| criteria.matches_type(r.sensor_type))
        .map(|r| r.normalize(now))
        .filter(|r| criteria.window.contains(r.timestamp))
        .filter(|r| criteria.matches_location(&r.location))
        .collect();

    sort_readings(&mut selected, criteria.order);

    debug!(
        "Filtered {} of {} readings (type={:?}, location={:?}, window={} .. {})",
        selected.len(),
        raw.len(),
        criteria.sensor_type,
        criteria.location,
        criteria.window.start,
        criteria.window.end
    );
    selected
}

/// Stable sort by timestamp.
pub fn sort_readings(readings: &mut [SensorReading], order: SortOrder) {
    // ---
    match order {
        SortOrder::Ascending => readings.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        SortOrder::Descending => readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
    }
}

/// Every distinct location label in the snapshot, ignoring all filters.
/// An empty label is a label like any other.
pub fn collect_locations(raw: &[RawSensorReading]) -> BTreeSet<String> {
    // ---
    raw.iter().map(|r| r.location.clone()).collect()
}
