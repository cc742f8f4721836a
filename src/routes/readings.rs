use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AppState, Owner};
use crate::error::{AppError, AppResult, PipelineError};
use crate::models::{SensorReading, SensorType};
use crate::pipeline::{
    build_snapshot, collect_locations, default_fallbacks, filter_readings, resolve_window,
    ExportFormat, ReadingFilter, SortOrder, TimeWindow, TrendSummary,
};
use crate::store::SourceQuery;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/readings", get(list_readings))
        .route("/readings/summary", get(summary))
        .route("/readings/export", get(export))
        .route("/locations", get(locations))
}

/// Filter parameters shared by the reading and evaluation routes.
///
/// `type` and `location` accept `all` as "no filter"; `period` defaults to
/// `day`; `start`/`end` are only read for `period=custom`.
#[derive(Debug, Default, Deserialize)]
pub struct ReadingsQuery {
    // ---
    #[serde(rename = "type")]
    pub sensor_type: Option<String>,
    pub location: Option<String>,
    pub period: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    pub format: Option<String>,
}

/// `None`, empty and `all` all mean "no filter".
fn selected(value: &Option<String>) -> Option<&str> {
    // ---
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl ReadingsQuery {
    // ---
    pub fn sensor_type(&self) -> Result<Option<SensorType>, PipelineError> {
        selected(&self.sensor_type).map(str::parse).transpose()
    }

    pub fn location(&self) -> Option<String> {
        selected(&self.location).map(String::from)
    }

    /// Resolve the window and assemble the pipeline criteria.
    pub fn criteria(&self, now: DateTime<Utc>) -> Result<ReadingFilter, PipelineError> {
        // ---
        let window = resolve_window(
            self.period.as_deref().unwrap_or("day"),
            self.start.as_deref(),
            self.end.as_deref(),
            now,
        )?;

        Ok(ReadingFilter::new(window)
            .sensor_type(self.sensor_type()?)
            .location(self.location())
            .order(self.order))
    }

    /// Filters a store may push down: type and location.
    fn source_query(&self) -> Result<SourceQuery, PipelineError> {
        // ---
        Ok(SourceQuery {
            sensor_type: self.sensor_type()?,
            location: self.location(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    // ---
    window: TimeWindow,
    count: usize,
    summaries: BTreeMap<SensorType, TrendSummary>,
    latest: BTreeMap<SensorType, SensorReading>,
    locations: BTreeSet<String>,
}

/// Handle `GET /readings`.
async fn list_readings(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> AppResult<Json<Vec<SensorReading>>> {
    // ---
    let now = Utc::now();
    let criteria = params.criteria(now)?;

    let raw = state
        .store
        .fetch_readings(&owner, &params.source_query()?)
        .await?;
    let readings = filter_readings(&raw, &criteria, now);

    info!(
        "GET /readings - {} of {} readings for {}",
        readings.len(),
        raw.len(),
        owner
    );
    Ok(Json(readings))
}

/// Handle `GET /readings/summary`.
///
/// The whole owner history is fetched so the location list covers every
/// zone; type and location filters are applied by the pipeline.
async fn summary(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> AppResult<Json<SummaryResponse>> {
    // ---
    let now = Utc::now();
    let criteria = params.criteria(now)?;

    let raw = state
        .store
        .fetch_readings(&owner, &SourceQuery::default())
        .await?;
    let snapshot = build_snapshot(&raw, &criteria, &default_fallbacks(), now);

    debug!(
        "GET /readings/summary - {} readings in window",
        snapshot.readings.len()
    );
    Ok(Json(SummaryResponse {
        window: snapshot.window,
        count: snapshot.readings.len(),
        summaries: snapshot.summaries,
        latest: snapshot.latest,
        locations: snapshot.locations,
    }))
}

/// Handle `GET /readings/export?format=csv|json`.
async fn export(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> AppResult<Response> {
    // ---
    let now = Utc::now();
    let format: ExportFormat = params.format.as_deref().unwrap_or("csv").parse()?;
    let criteria = params.criteria(now)?;

    let raw = state
        .store
        .fetch_readings(&owner, &params.source_query()?)
        .await?;
    let readings = filter_readings(&raw, &criteria, now);
    let body = format
        .render(&readings)
        .map_err(|e| AppError::Store(e.into()))?;

    info!(
        "GET /readings/export - {} readings as {:?}",
        readings.len(),
        format
    );
    let disposition = format!("attachment; filename=\"{}\"", format.file_name(now));
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Handle `GET /locations`.
async fn locations(
    Owner(owner): Owner,
    State(state): State<AppState>,
) -> AppResult<Json<BTreeSet<String>>> {
    // ---
    let raw = state
        .store
        .fetch_readings(&owner, &SourceQuery::default())
        .await?;
    Ok(Json(collect_locations(&raw)))
}
