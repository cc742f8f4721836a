//! Per-owner alert threshold routes.
//!
//! Owners only store the bands they changed; reads merge them over the
//! built-in defaults.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::info;

use super::{AppState, Owner};
use crate::error::AppResult;
use crate::models::{AlertThreshold, SensorType, ThresholdBounds, Thresholds};
use crate::store::Store;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/thresholds", get(list_thresholds))
        .route("/thresholds/{sensor_type}", put(update_threshold))
}

/// Defaults overlaid with the owner's saved bands.
pub(super) async fn effective_thresholds(
    store: &dyn Store,
    owner: &str,
) -> anyhow::Result<Thresholds> {
    // ---
    let configured = store.fetch_thresholds(owner).await?;
    Ok(Thresholds::with_overrides(configured))
}

/// Handle `GET /thresholds`.
async fn list_thresholds(
    Owner(owner): Owner,
    State(state): State<AppState>,
) -> AppResult<Json<Thresholds>> {
    // ---
    let thresholds = effective_thresholds(state.store.as_ref(), &owner).await?;
    Ok(Json(thresholds))
}

/// Handle `PUT /thresholds/{type}`; answers with the updated effective set.
async fn update_threshold(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Path(sensor_type): Path<String>,
    Json(bounds): Json<ThresholdBounds>,
) -> AppResult<Json<Thresholds>> {
    // ---
    let sensor_type: SensorType = sensor_type.parse()?;
    let threshold = AlertThreshold::new(bounds.min, bounds.max)?;

    state
        .store
        .save_threshold(&owner, sensor_type, threshold)
        .await?;
    info!(
        "PUT /thresholds/{} - {} now {}..{}",
        sensor_type,
        owner,
        threshold.min(),
        threshold.max()
    );

    let thresholds = effective_thresholds(state.store.as_ref(), &owner).await?;
    Ok(Json(thresholds))
}
