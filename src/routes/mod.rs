//! HTTP gateway.
//!
//! Each sibling module exports a subrouter; this module merges them and owns
//! the shared [`AppState`] and the [`Owner`] extractor every scoped route uses.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts, Router};

use crate::error::AppError;
use crate::store::{SensorFeed, Store};
use crate::Config;

mod alerts;
mod health;
mod ingest;
mod readings;
mod thresholds;

pub use readings::ReadingsQuery;

// ---

/// Header carrying the opaque owner identity.
pub const OWNER_HEADER: &str = "x-owner-id";

#[derive(Clone)]
pub struct AppState {
    // ---
    pub store: Arc<dyn Store>,
    pub feed: Option<Arc<SensorFeed>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, feed: Option<SensorFeed>, config: Config) -> Self {
        // ---
        Self {
            store,
            feed: feed.map(Arc::new),
            config: Arc::new(config),
        }
    }
}

/// Account every query is scoped to.
///
/// Taken from the `X-Owner-Id` header, else the configured demo owner. A
/// request with neither is rejected rather than silently mixed into demo data.
#[derive(Debug, Clone, PartialEq)]
pub struct Owner(pub String);

impl FromRequestParts<AppState> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // ---
        let header = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match (header, &state.config.demo_owner_id) {
            (Some(owner), _) => Ok(Owner(owner.to_string())),
            (None, Some(demo)) => Ok(Owner(demo.clone())),
            (None, None) => {
                let reason = format!("missing {OWNER_HEADER} header");
                Err(AppError::BadRequest(reason))
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(alerts::router())
        .merge(thresholds::router())
        .merge(ingest::router())
        .merge(health::router())
        .with_state(state)
}
