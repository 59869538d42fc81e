//! Error types for oleoscan
//!
//! `ApiError` covers everything a request handler can surface to a client.
//! Calibration has its own internal error type (`calibration::CalibrationError`)
//! which is never mapped onto an HTTP response: calibration runs after the scan
//! row is committed and its failures are logged by the worker, not the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::estimator::EstimatorError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request input (400)
    #[error("{0}")]
    Validation(String),

    /// Uploaded file is not an accepted image type (400)
    #[error("{0}")]
    UnsupportedMedia(String),

    /// Composition analysis failed (500)
    #[error("Analysis failed: {0}")]
    Estimator(#[from] EstimatorError),

    /// Persistence unavailable or write failure (500, retryable)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) | ApiError::UnsupportedMedia(_) => StatusCode::BAD_REQUEST,
            ApiError::Estimator(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
