//! Collaborators the service fetches from and writes to.
//!
//! The pipeline never talks to a backend; handlers receive an
//! `Arc<dyn Store>` through application state and hand snapshots to it.
//! - `memory`: process-local store for tests and database-less runs
//! - `postgres`: sqlx-backed store
//! - `feed`: upstream HTTP source of raw readings

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AlertEvent, AlertThreshold, RawSensorReading, SensorType, StoredAlert};

mod feed;
mod memory;
mod postgres;

pub use feed::SensorFeed;
pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

/// Filters a store may apply before returning a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceQuery {
    pub sensor_type: Option<SensorType>,
    pub location: Option<String>,
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    // ---
    /// All readings of `owner` matching `query`, in no particular order.
    async fn fetch_readings(&self, owner: &str, query: &SourceQuery)
        -> Result<Vec<RawSensorReading>>;

    /// Persist a reading and return the identifier the store assigned.
    async fn insert_reading(&self, reading: &RawSensorReading) -> Result<String>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    // ---
    async fn fetch_alerts(&self, owner: &str, is_read: Option<bool>) -> Result<Vec<StoredAlert>>;

    async fn create_alert(&self, alert: &AlertEvent) -> Result<String>;

    /// Mark one of `owner`'s alerts read. Returns `false` when the owner has
    /// no alert with this id; an alert that is already read still returns
    /// `true`.
    async fn mark_read(&self, owner: &str, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait ThresholdStore: Send + Sync {
    // ---
    /// Thresholds the owner configured explicitly; defaults are not included.
    async fn fetch_thresholds(&self, owner: &str) -> Result<BTreeMap<SensorType, AlertThreshold>>;

    async fn save_threshold(
        &self,
        owner: &str,
        sensor_type: SensorType,
        threshold: AlertThreshold,
    ) -> Result<()>;
}

/// Full backend used by the HTTP layer.
pub trait Store: ReadingStore + AlertStore + ThresholdStore {
    /// Short backend name reported by `/health`.
    fn backend(&self) -> &'static str;
}
