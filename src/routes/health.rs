// src/routes/health.rs
//! API health check endpoint.
//!
//! Used by container orchestrators and CI pipelines to verify that the
//! service is up. Reports which store backend is active without touching it.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.store.backend(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
