//! Write path for readings: single submissions and upstream feed pulls.
//!
//! Every stored reading is normalized and checked against the owner's
//! effective thresholds; breaches are persisted as alerts right away.
//! Readings that arrive without a timestamp are stamped with the time they
//! were received before they are stored.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::thresholds::effective_thresholds;
use super::{AppState, Owner};
use crate::error::{AppError, AppResult};
use crate::models::{RawSensorReading, RawTimestamp, StoredAlert, Thresholds};
use crate::pipeline::evaluate_reading;
use crate::store::Store;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/readings", post(create_reading))
        .route("/ingest", post(ingest_feed))
}

#[derive(Debug, Serialize)]
struct CreatedReading {
    id: String,
    alerts: Vec<StoredAlert>,
}

/// Outcome of one feed pull.
#[derive(Debug, Default, Serialize)]
struct IngestReport {
    // ---
    fetched: usize,
    stored: usize,
    failed: usize,
    /// Readings tagged with a different owner; never stored.
    foreign: usize,
    alerts_raised: usize,
}

/// Store one reading, then persist any alert it raises.
///
/// A reading without a timestamp is stamped with `now` first.
async fn store_reading(
    store: &dyn Store,
    reading: &mut RawSensorReading,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> anyhow::Result<(String, Vec<StoredAlert>)> {
    // ---
    reading.timestamp.get_or_insert(RawTimestamp::Instant(now));
    let id = store.insert_reading(reading).await?;

    let mut normalized = reading.normalize(now);
    normalized.id = id.clone();

    let mut alerts = Vec::new();
    if let Some(event) = evaluate_reading(&normalized, thresholds) {
        let alert_id = store.create_alert(&event).await?;
        debug!(
            "Reading {} raised alert {}: {}",
            id, alert_id, event.message
        );
        alerts.push(StoredAlert {
            id: alert_id,
            event,
        });
    }
    Ok((id, alerts))
}

/// Handle `POST /readings`.
async fn create_reading(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Json(mut reading): Json<RawSensorReading>,
) -> AppResult<(StatusCode, Json<CreatedReading>)> {
    // ---
    if !reading.value.is_finite() {
        return Err(AppError::BadRequest("value must be finite".into()));
    }
    reading.owner_id = owner;

    let store = state.store.as_ref();
    let thresholds = effective_thresholds(store, &reading.owner_id).await?;
    let (id, alerts) = store_reading(store, &mut reading, &thresholds, Utc::now()).await?;

    info!(
        "POST /readings - stored {} {} for {} ({} alert(s))",
        reading.sensor_type,
        id,
        reading.owner_id,
        alerts.len()
    );
    Ok((StatusCode::CREATED, Json(CreatedReading { id, alerts })))
}

/// Handle `POST /ingest`: pull every page from the upstream feed.
///
/// Readings without an owner are attributed to the caller; readings that
/// name someone else are skipped. A failing insert is logged and the pull
/// carries on.
async fn ingest_feed(
    Owner(owner): Owner,
    State(state): State<AppState>,
) -> AppResult<Json<IngestReport>> {
    // ---
    let Some(feed) = state.feed.as_ref() else {
        return Err(AppError::ServiceUnavailable(
            "no upstream sensor feed configured".into(),
        ));
    };

    let readings = feed.fetch_all().await?;
    let store = state.store.as_ref();
    let thresholds = effective_thresholds(store, &owner).await?;
    let now = Utc::now();

    let mut report = IngestReport {
        fetched: readings.len(),
        ..IngestReport::default()
    };

    for mut reading in readings {
        if reading.owner_id.is_empty() {
            reading.owner_id = owner.clone();
        } else if reading.owner_id != owner {
            report.foreign += 1;
            continue;
        }

        match store_reading(store, &mut reading, &thresholds, now).await {
            Ok((_, alerts)) => {
                report.stored += 1;
                report.alerts_raised += alerts.len();
            }
            Err(e) => {
                error!("Failed to store reading from feed: {e:#}");
                report.failed += 1;
            }
        }
    }

    if report.foreign > 0 {
        warn!(
            "Skipped {} feed readings owned by someone else",
            report.foreign
        );
    }
    info!(
        "POST /ingest - fetched {}, stored {}, failed {}, {} alert(s) for {}",
        report.fetched, report.stored, report.failed, report.alerts_raised, owner
    );
    Ok(Json(report))
}
