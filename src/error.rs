//! Error types for the aggregation pipeline and the HTTP layer.
//!
//! [`PipelineError`] is what the pure pipeline functions return. [`AppError`]
//! wraps it together with collaborator failures and maps each case onto an
//! HTTP status for the axum handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

// ---

/// Errors raised by the pipeline itself. Never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    // ---
    /// Unknown period, sensor type or export format, or missing custom bounds.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid threshold: min {min} is greater than max {max}")]
    InvalidThreshold { min: f64, max: f64 },
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ---
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Store or upstream failure; the caller may retry.
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, error_message) = match &self {
            Self::Pipeline(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Store(e) => {
                tracing::error!("Store error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Temporary failure, please retry".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_status_mapping() {
        // ---
        let invalid = AppError::from(PipelineError::InvalidFilter("unknown period 'year'".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = AppError::NotFound("alert abc".into());
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let store = AppError::from(anyhow::anyhow!("connection reset"));
        assert_eq!(
            store.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_pipeline_messages() {
        // ---
        let err = PipelineError::InvalidThreshold {
            min: 30.0,
            max: 15.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid threshold: min 30 is greater than max 15"
        );
    }
}
