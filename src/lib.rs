//! oleoscan library - oilseed composition scan service
//!
//! Upload an image of a grain/oilseed sample, get an oil/protein/FFA
//! estimate, and track how well scans agree with manual lab reports. When
//! agreement drops below threshold, a background worker refits the
//! estimator's correction coefficients.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod calibration;
pub mod config;
pub mod db;
pub mod error;
pub mod estimator;

use calibration::{CalibrationRequest, ModelStore};
use config::Config;
use estimator::CompositionEstimator;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    /// Injectable analysis backend
    pub estimator: Arc<dyn CompositionEstimator>,
    /// Process-wide correction model, single writer
    pub model: Arc<ModelStore>,
    /// Channel into the background calibration worker
    pub calibration: mpsc::Sender<CalibrationRequest>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: Arc<Config>,
        estimator: Arc<dyn CompositionEstimator>,
        model: Arc<ModelStore>,
        calibration: mpsc::Sender<CalibrationRequest>,
    ) -> Self {
        Self {
            db,
            config,
            estimator,
            model,
            calibration,
        }
    }
}

/// Build application router
///
/// The bare `/upload` and `/last-samples` paths are aliases kept for older
/// clients; `/api/...` is canonical.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(api::upload_sample))
        .route("/upload", post(api::upload_sample))
        .route("/api/last-samples", get(api::last_samples))
        .route("/last-samples", get(api::last_samples))
        .route("/api/get-enhanced-accuracy", get(api::get_enhanced_accuracy))
        .route("/health", get(api::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
