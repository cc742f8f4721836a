//! Process-local store.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AlertStore, ReadingStore, SourceQuery, Store, ThresholdStore};
use crate::models::{AlertEvent, AlertThreshold, RawSensorReading, SensorType, StoredAlert};

// ---

#[derive(Debug, Default)]
pub struct MemoryStore {
    // ---
    readings: RwLock<Vec<RawSensorReading>>,
    alerts: RwLock<Vec<StoredAlert>>,
    thresholds: RwLock<BTreeMap<(String, SensorType), AlertThreshold>>,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with readings as-is; ids already present are kept.
    pub fn with_readings(readings: Vec<RawSensorReading>) -> Self {
        // ---
        Self {
            readings: RwLock::new(readings),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    // ---
    async fn fetch_readings(
        &self,
        owner: &str,
        query: &SourceQuery,
    ) -> Result<Vec<RawSensorReading>> {
        // ---
        let location = query.location.as_deref();
        let readings = self.readings.read().await;
        Ok(readings
            .iter()
            .filter(|r| r.owner_id == owner)
            .filter(|r| query.sensor_type.map_or(true, |t| t == r.sensor_type))
            .filter(|r| location.map_or(true, |l| l == r.location))
            .cloned()
            .collect())
    }

    async fn insert_reading(&self, reading: &RawSensorReading) -> Result<String> {
        // ---
        let id = Uuid::new_v4().to_string();
        let mut stored = reading.clone();
        stored.id = id.clone();
        self.readings.write().await.push(stored);
        Ok(id)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    // ---
    async fn fetch_alerts(&self, owner: &str, is_read: Option<bool>) -> Result<Vec<StoredAlert>> {
        // ---
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| a.event.owner_id == owner)
            .filter(|a| is_read.map_or(true, |flag| a.event.is_read == flag))
            .cloned()
            .collect())
    }

    async fn create_alert(&self, alert: &AlertEvent) -> Result<String> {
        // ---
        let id = Uuid::new_v4().to_string();
        self.alerts.write().await.push(StoredAlert {
            id: id.clone(),
            event: alert.clone(),
        });
        Ok(id)
    }

    async fn mark_read(&self, owner: &str, id: &str) -> Result<bool> {
        // ---
        let mut alerts = self.alerts.write().await;
        match alerts
            .iter_mut()
            .find(|a| a.id == id && a.event.owner_id == owner)
        {
            Some(alert) => {
                alert.event.mark_read();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ThresholdStore for MemoryStore {
    // ---
    async fn fetch_thresholds(&self, owner: &str) -> Result<BTreeMap<SensorType, AlertThreshold>> {
        // ---
        let thresholds = self.thresholds.read().await;
        Ok(thresholds
            .iter()
            .filter(|((o, _), _)| o == owner)
            .map(|((_, sensor_type), threshold)| (*sensor_type, *threshold))
            .collect())
    }

    async fn save_threshold(
        &self,
        owner: &str,
        sensor_type: SensorType,
        threshold: AlertThreshold,
    ) -> Result<()> {
        // ---
        self.thresholds
            .write()
            .await
            .insert((owner.to_string(), sensor_type), threshold);
        Ok(())
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{RawTimestamp, Severity};
    use chrono::{TimeZone, Utc};
    use tokio_test::block_on;

    fn raw(owner: &str, sensor_type: SensorType, location: &str) -> RawSensorReading {
        // ---
        RawSensorReading {
            id: String::new(),
            sensor_id: None,
            sensor_type,
            value: 21.5,
            unit: "°C".to_string(),
            location: location.to_string(),
            timestamp: Some(RawTimestamp::Text("2025-02-01".to_string())),
            owner_id: owner.to_string(),
        }
    }

    fn alert(owner: &str) -> AlertEvent {
        // ---
        AlertEvent {
            sensor_type: SensorType::Humidity,
            severity: Severity::Low,
            message: "Niveau d'humidité bas".to_string(),
            location: "Zone Est".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap(),
            is_read: false,
            owner_id: owner.to_string(),
        }
    }

    #[test]
    fn test_readings_are_scoped_and_prefiltered() {
        // ---
        let store = MemoryStore::new();
        block_on(async {
            let id = store
                .insert_reading(&raw("farm-1", SensorType::Temperature, "Zone Nord"))
                .await
                .unwrap();
            assert!(!id.is_empty());
            store
                .insert_reading(&raw("farm-1", SensorType::Water, "Zone Sud"))
                .await
                .unwrap();
            store
                .insert_reading(&raw("farm-2", SensorType::Water, "Zone Sud"))
                .await
                .unwrap();

            let all = store
                .fetch_readings("farm-1", &SourceQuery::default())
                .await
                .unwrap();
            assert_eq!(all.len(), 2);
            assert!(all.iter().any(|r| r.id == id));

            let query = SourceQuery {
                sensor_type: Some(SensorType::Water),
                location: Some("Zone Sud".to_string()),
            };
            let water = store.fetch_readings("farm-1", &query).await.unwrap();
            assert_eq!(water.len(), 1);
            assert_eq!(water[0].owner_id, "farm-1");
        });
    }

    #[test]
    fn test_mark_read_twice_succeeds() {
        // ---
        let store = MemoryStore::new();
        block_on(async {
            let id = store.create_alert(&alert("farm-1")).await.unwrap();

            assert!(store.mark_read("farm-1", &id).await.unwrap());
            assert!(store.mark_read("farm-1", &id).await.unwrap());
            assert!(!store.mark_read("farm-1", "missing").await.unwrap());

            let read = store.fetch_alerts("farm-1", Some(true)).await.unwrap();
            assert_eq!(read.len(), 1);
            assert!(read[0].event.is_read);
            assert!(store
                .fetch_alerts("farm-1", Some(false))
                .await
                .unwrap()
                .is_empty());
        });
    }

    #[test]
    fn test_mark_read_is_owner_scoped() {
        // ---
        let store = MemoryStore::new();
        block_on(async {
            let id = store.create_alert(&alert("farm-1")).await.unwrap();

            assert!(!store.mark_read("farm-2", &id).await.unwrap());
            let unread = store.fetch_alerts("farm-1", Some(false)).await.unwrap();
            assert_eq!(unread.len(), 1);
        });
    }

    #[test]
    fn test_thresholds_per_owner() {
        // ---
        let store = MemoryStore::new();
        block_on(async {
            let band = AlertThreshold::new(35.0, 70.0).unwrap();
            store
                .save_threshold("farm-1", SensorType::Humidity, band)
                .await
                .unwrap();

            let mine = store.fetch_thresholds("farm-1").await.unwrap();
            assert_eq!(mine.get(&SensorType::Humidity), Some(&band));
            assert!(store.fetch_thresholds("farm-2").await.unwrap().is_empty());
        });
    }
}
