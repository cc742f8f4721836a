//! Sensor aggregation and alerting service for agricultural field monitoring.
//!
//! Raw readings arrive from field sensors (or an upstream feed), are stored
//! per owner, and are turned on request into filtered views, per-type
//! summaries, threshold alerts and exports.
//!
//! Module layout follows the Explicit Module Boundary Pattern (EMBP):
//! - `pipeline`: pure aggregation over a snapshot of readings
//! - `store`: persistence and upstream collaborators behind traits
//! - `routes`: axum handlers, one subrouter per resource
//! - `config`, `schema`, `error`: ambient plumbing

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult, PipelineError};
pub use models::{
    AlertEvent, AlertThreshold, RawSensorReading, RawTimestamp, SensorReading, SensorType,
    Severity, StoredAlert, Thresholds,
};
