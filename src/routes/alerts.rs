use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::thresholds::effective_thresholds;
use super::{AppState, Owner, ReadingsQuery};
use crate::error::{AppError, AppResult};
use crate::models::{AlertEvent, SensorType, Severity, StoredAlert};
use crate::pipeline::{
    build_snapshot, default_fallbacks, demo_alerts, evaluate_thresholds, select_alerts,
    unread_count, AlertView,
};
use crate::store::{SourceQuery, Store};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/alerts/{id}/read", put(mark_read))
        .route("/alerts/evaluate", post(evaluate))
        .route("/alerts/demo", post(inject_demo))
}

#[derive(Debug, Default, Deserialize)]
struct AlertsQuery {
    #[serde(default)]
    view: AlertView,
}

#[derive(Debug, Serialize)]
struct AlertList {
    // ---
    /// Unread alerts across the whole list, whatever the view.
    unread: usize,
    alerts: Vec<StoredAlert>,
}

/// Body of `POST /alerts`.
#[derive(Debug, Deserialize)]
struct NewAlert {
    // ---
    #[serde(rename = "type")]
    sensor_type: SensorType,
    #[serde(default = "default_severity")]
    severity: Severity,
    #[serde(default)]
    message: String,
    #[serde(default)]
    location: String,
    timestamp: Option<DateTime<Utc>>,
}

fn default_severity() -> Severity {
    Severity::Medium
}

/// Persist alerts in order, pairing each with its new id.
async fn persist_alerts(
    store: &dyn Store,
    events: Vec<AlertEvent>,
) -> anyhow::Result<Vec<StoredAlert>> {
    // ---
    let mut stored = Vec::with_capacity(events.len());
    for event in events {
        let id = store.create_alert(&event).await?;
        stored.push(StoredAlert { id, event });
    }
    Ok(stored)
}

/// Handle `GET /alerts?view=all|unread|high`.
async fn list_alerts(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<AlertList>> {
    // ---
    let all = state.store.fetch_alerts(&owner, None).await?;
    let unread = unread_count(&all);
    let alerts = select_alerts(all, query.view);

    debug!("GET /alerts - {} shown, {} unread", alerts.len(), unread);
    Ok(Json(AlertList { unread, alerts }))
}

/// Handle `POST /alerts`.
async fn create_alert(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Json(body): Json<NewAlert>,
) -> AppResult<(StatusCode, Json<Value>)> {
    // ---
    if body.message.trim().is_empty() || body.location.trim().is_empty() {
        return Err(AppError::BadRequest(
            "message and location are required".into(),
        ));
    }

    let event = AlertEvent {
        sensor_type: body.sensor_type,
        severity: body.severity,
        message: body.message,
        location: body.location,
        timestamp: body.timestamp.unwrap_or_else(Utc::now),
        is_read: false,
        owner_id: owner,
    };
    let id = state.store.create_alert(&event).await?;

    info!(
        "POST /alerts - {} alert {} for {}",
        event.severity.as_str(),
        id,
        event.owner_id
    );
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Handle `PUT /alerts/{id}/read`. Marking a read alert again succeeds;
/// another owner's alert is reported as not found.
async fn mark_read(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    // ---
    if !state.store.mark_read(&owner, &id).await? {
        return Err(AppError::NotFound(format!("alert {id}")));
    }
    debug!("PUT /alerts/{}/read", id);
    Ok(Json(json!({ "success": true })))
}

/// Handle `POST /alerts/evaluate`: check the latest reading of every type
/// in the requested window against the owner's thresholds.
async fn evaluate(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> AppResult<Json<Vec<StoredAlert>>> {
    // ---
    let now = Utc::now();
    let criteria = params.criteria(now)?;
    let source = SourceQuery {
        sensor_type: criteria.sensor_type,
        location: criteria.location.clone(),
    };

    let store = state.store.as_ref();
    let raw = store.fetch_readings(&owner, &source).await?;
    let snapshot = build_snapshot(&raw, &criteria, &default_fallbacks(), now);
    let thresholds = effective_thresholds(store, &owner).await?;

    let events = evaluate_thresholds(&snapshot.latest, &thresholds);
    let raised = persist_alerts(store, events).await?;

    info!(
        "POST /alerts/evaluate - {} alert(s) raised for {}",
        raised.len(),
        owner
    );
    Ok(Json(raised))
}

/// Handle `POST /alerts/demo`.
async fn inject_demo(
    Owner(owner): Owner,
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<Vec<StoredAlert>>)> {
    // ---
    let events = demo_alerts(&owner, Utc::now());
    let stored = persist_alerts(state.store.as_ref(), events).await?;

    info!(
        "POST /alerts/demo - {} demo alerts for {}",
        stored.len(),
        owner
    );
    Ok((StatusCode::CREATED, Json(stored)))
}
