//! Data models for the sensor pipeline.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pipeline::normalize::normalize_timestamp;

// ---

/// Kind of measurement carried by a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    // ---
    Humidity,
    Temperature,
    Water,
}

impl SensorType {
    // ---
    pub const ALL: [SensorType; 3] = [
        SensorType::Humidity,
        SensorType::Temperature,
        SensorType::Water,
    ];

    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            SensorType::Humidity => "humidity",
            SensorType::Temperature => "temperature",
            SensorType::Water => "water",
        }
    }

    /// Display label used in alert messages.
    pub fn label(&self) -> &'static str {
        // ---
        match self {
            SensorType::Humidity => "Humidité",
            SensorType::Temperature => "Température",
            SensorType::Water => "Niveau d'eau",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_lowercase().as_str() {
            "humidity" => Ok(SensorType::Humidity),
            "temperature" => Ok(SensorType::Temperature),
            "water" => Ok(SensorType::Water),
            other => Err(PipelineError::InvalidFilter(format!(
                "unknown sensor type '{other}'"
            ))),
        }
    }
}

/// Timestamp exactly as a document was stored.
///
/// Readings arrive from several writers that do not agree on an encoding:
/// a native instant, a `{ "seconds": .. }` wrapper object, an epoch-millis
/// number or free text. Variant order matters for deserialization: an RFC 3339
/// string becomes [`RawTimestamp::Instant`], any other string stays
/// [`RawTimestamp::Text`], and anything else lands in
/// [`RawTimestamp::Unrecognized`] so a single odd document never fails a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    // ---
    Seconds {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    Instant(DateTime<Utc>),
    Millis(f64),
    Text(String),
    Unrecognized(serde_json::Value),
}

/// Reading as fetched from the store, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensorReading {
    // ---
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    #[serde(rename = "type", alias = "sensorType")]
    pub sensor_type: SensorType,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default, alias = "userId")]
    pub owner_id: String,
}

/// Normalized reading handed to consumers (charts, summaries, exporters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    // ---
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub owner_id: String,
}

impl RawSensorReading {
    // ---
    /// Resolve the stored timestamp; unresolvable values become `now`.
    pub fn normalize(&self, now: DateTime<Utc>) -> SensorReading {
        // ---
        SensorReading {
            id: self.id.clone(),
            sensor_id: self.sensor_id.clone(),
            sensor_type: self.sensor_type,
            value: self.value,
            unit: self.unit.clone(),
            location: self.location.clone(),
            timestamp: normalize_timestamp(self.timestamp.as_ref(), now),
            owner_id: self.owner_id.clone(),
        }
    }
}

impl From<SensorReading> for RawSensorReading {
    fn from(reading: SensorReading) -> Self {
        // ---
        RawSensorReading {
            id: reading.id,
            sensor_id: reading.sensor_id,
            sensor_type: reading.sensor_type,
            value: reading.value,
            unit: reading.unit,
            location: reading.location,
            timestamp: Some(RawTimestamp::Instant(reading.timestamp)),
            owner_id: reading.owner_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    // ---
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl FromStr for Severity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(PipelineError::InvalidFilter(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// An out-of-band condition reported to the owner.
///
/// `is_read` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    // ---
    #[serde(rename = "type", alias = "sensorType")]
    pub sensor_type: SensorType,
    pub severity: Severity,
    pub message: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(alias = "userId")]
    pub owner_id: String,
}

impl AlertEvent {
    // ---
    /// Mark the alert read. Returns whether the state changed; calling it on
    /// an alert that is already read is a successful no-op.
    pub fn mark_read(&mut self) -> bool {
        // ---
        let changed = !self.is_read;
        self.is_read = true;
        changed
    }
}

/// Alert together with the identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    // ---
    pub id: String,
    #[serde(flatten)]
    pub event: AlertEvent,
}

/// Unvalidated `{min, max}` pair as it arrives over the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdBounds {
    pub min: f64,
    pub max: f64,
}

/// Acceptable band for one sensor type. Always `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdBounds")]
pub struct AlertThreshold {
    min: f64,
    max: f64,
}

impl AlertThreshold {
    // ---
    pub fn new(min: f64, max: f64) -> Result<Self, PipelineError> {
        // ---
        if min.is_nan() || max.is_nan() || min > max {
            return Err(PipelineError::InvalidThreshold { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl TryFrom<ThresholdBounds> for AlertThreshold {
    type Error = PipelineError;

    fn try_from(bounds: ThresholdBounds) -> Result<Self, Self::Error> {
        AlertThreshold::new(bounds.min, bounds.max)
    }
}

/// Per-type thresholds for one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Thresholds(BTreeMap<SensorType, AlertThreshold>);

impl Thresholds {
    // ---
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Defaults, replaced type by type with whatever the owner configured.
    pub fn with_overrides(configured: BTreeMap<SensorType, AlertThreshold>) -> Self {
        // ---
        let mut thresholds = Self::default();
        thresholds.0.extend(configured);
        thresholds
    }

    pub fn get(&self, sensor_type: SensorType) -> Option<&AlertThreshold> {
        self.0.get(&sensor_type)
    }

    pub fn set(&mut self, sensor_type: SensorType, threshold: AlertThreshold) {
        self.0.insert(sensor_type, threshold);
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        // ---
        let band = |min, max| AlertThreshold { min, max };
        Self(BTreeMap::from([
            (SensorType::Temperature, band(15.0, 30.0)),
            (SensorType::Humidity, band(40.0, 80.0)),
            (SensorType::Water, band(30.0, 90.0)),
        ]))
    }
}
