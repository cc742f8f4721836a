//! PostgreSQL-backed store.
//!
//! Readings keep their timestamp exactly as received in a JSONB column, so
//! every encoding survives the round trip and is only resolved by the
//! pipeline. Tables are created by `schema::create_schema`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use tracing::warn;
use uuid::Uuid;

use super::{AlertStore, ReadingStore, SourceQuery, Store, ThresholdStore};
use crate::models::{
    AlertEvent, AlertThreshold, RawSensorReading, RawTimestamp, SensorType, Severity,
    StoredAlert,
};

// ---

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReadingRow {
    // ---
    id: Uuid,
    owner_id: String,
    sensor_id: Option<String>,
    sensor_type: String,
    value: f64,
    unit: String,
    location: String,
    timestamp_raw: Option<Json<RawTimestamp>>,
}

impl ReadingRow {
    fn into_reading(self) -> Option<RawSensorReading> {
        // ---
        let sensor_type = match self.sensor_type.parse::<SensorType>() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping reading {}: {}", self.id, e);
                return None;
            }
        };

        Some(RawSensorReading {
            id: self.id.to_string(),
            sensor_id: self.sensor_id,
            sensor_type,
            value: self.value,
            unit: self.unit,
            location: self.location,
            timestamp: self.timestamp_raw.map(|Json(ts)| ts),
            owner_id: self.owner_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    // ---
    id: Uuid,
    owner_id: String,
    sensor_type: String,
    severity: String,
    message: String,
    location: String,
    timestamp: DateTime<Utc>,
    is_read: bool,
}

impl AlertRow {
    fn into_alert(self) -> Option<StoredAlert> {
        // ---
        let parsed = self
            .sensor_type
            .parse::<SensorType>()
            .and_then(|t| self.severity.parse::<Severity>().map(|s| (t, s)));
        let (sensor_type, severity) = match parsed {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Skipping alert {}: {}", self.id, e);
                return None;
            }
        };

        Some(StoredAlert {
            id: self.id.to_string(),
            event: AlertEvent {
                sensor_type,
                severity,
                message: self.message,
                location: self.location,
                timestamp: self.timestamp,
                is_read: self.is_read,
                owner_id: self.owner_id,
            },
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ThresholdRow {
    sensor_type: String,
    min_value: f64,
    max_value: f64,
}

#[async_trait]
impl ReadingStore for PgStore {
    // ---
    async fn fetch_readings(
        &self,
        owner: &str,
        query: &SourceQuery,
    ) -> Result<Vec<RawSensorReading>> {
        // ---
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, sensor_id, sensor_type, value, unit, location, timestamp_raw
            FROM sensor_data
            WHERE owner_id = $1
              AND ($2::TEXT IS NULL OR sensor_type = $2)
              AND ($3::TEXT IS NULL OR location = $3)
            "#,
        )
        .bind(owner)
        .bind(query.sensor_type.map(|t| t.as_str()))
        .bind(query.location.as_deref())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch readings for owner '{owner}'"))?;

        let readings = rows.into_iter().filter_map(ReadingRow::into_reading);
        Ok(readings.collect())
    }

    async fn insert_reading(&self, reading: &RawSensorReading) -> Result<String> {
        // ---
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO sensor_data (
                id, owner_id, sensor_id, sensor_type,
                value, unit, location, timestamp_raw
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&reading.owner_id)
        .bind(&reading.sensor_id)
        .bind(reading.sensor_type.as_str())
        .bind(reading.value)
        .bind(&reading.unit)
        .bind(&reading.location)
        .bind(reading.timestamp.as_ref().map(Json))
        .execute(&self.pool)
        .await
        .context("Failed to store reading")?;

        Ok(id.to_string())
    }
}

#[async_trait]
impl AlertStore for PgStore {
    // ---
    async fn fetch_alerts(&self, owner: &str, is_read: Option<bool>) -> Result<Vec<StoredAlert>> {
        // ---
        let rows: Vec<AlertRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, sensor_type, severity, message, location, timestamp, is_read
            FROM alerts
            WHERE owner_id = $1
              AND ($2::BOOLEAN IS NULL OR is_read = $2)
            ORDER BY timestamp DESC
            "#,
        )
        .bind(owner)
        .bind(is_read)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch alerts for owner '{owner}'"))?;

        Ok(rows.into_iter().filter_map(AlertRow::into_alert).collect())
    }

    async fn create_alert(&self, alert: &AlertEvent) -> Result<String> {
        // ---
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO alerts (
                id, owner_id, sensor_type, severity,
                message, location, timestamp, is_read
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&alert.owner_id)
        .bind(alert.sensor_type.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(&alert.location)
        .bind(alert.timestamp)
        .bind(alert.is_read)
        .execute(&self.pool)
        .await
        .context("Failed to store alert")?;

        Ok(id.to_string())
    }

    async fn mark_read(&self, owner: &str, id: &str) -> Result<bool> {
        // ---
        // Ids this store never issued cannot match a row
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };

        let result = sqlx::query(
            "UPDATE alerts SET is_read = TRUE WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to mark alert {id} read"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ThresholdStore for PgStore {
    // ---
    async fn fetch_thresholds(&self, owner: &str) -> Result<BTreeMap<SensorType, AlertThreshold>> {
        // ---
        let rows: Vec<ThresholdRow> = sqlx::query_as(
            "SELECT sensor_type, min_value, max_value FROM alert_thresholds WHERE owner_id = $1",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch thresholds for owner '{owner}'"))?;

        let mut thresholds = BTreeMap::new();
        for row in rows {
            let band = AlertThreshold::new(row.min_value, row.max_value);
            let parsed = row
                .sensor_type
                .parse::<SensorType>()
                .and_then(|t| band.map(|b| (t, b)));
            match parsed {
                Ok((sensor_type, band)) => {
                    thresholds.insert(sensor_type, band);
                }
                Err(e) => warn!("Ignoring stored threshold for '{}': {}", owner, e),
            }
        }
        Ok(thresholds)
    }

    async fn save_threshold(
        &self,
        owner: &str,
        sensor_type: SensorType,
        threshold: AlertThreshold,
    ) -> Result<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO alert_thresholds (owner_id, sensor_type, min_value, max_value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id, sensor_type) DO UPDATE SET
                min_value = EXCLUDED.min_value,
                max_value = EXCLUDED.max_value
            "#,
        )
        .bind(owner)
        .bind(sensor_type.as_str())
        .bind(threshold.min())
        .bind(threshold.max())
        .execute(&self.pool)
        .await
        .context("Failed to store threshold")?;

        Ok(())
    }
}

impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }
}
