//! Enhanced accuracy endpoint

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::calibration::enhanced_accuracy;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AccuracyResponse {
    #[serde(rename = "overallAccuracy")]
    pub overall_accuracy: String,
}

/// GET /api/get-enhanced-accuracy
///
/// Weighted, outlier-filtered agreement between manual lab reports and scan
/// readings, formatted as a percentage string.
pub async fn get_enhanced_accuracy(State(state): State<AppState>) -> ApiResult<Json<AccuracyResponse>> {
    let manual = db::manual_reports(&state.db).await?;
    let scans = db::scan_records(&state.db).await?;
    let overall = enhanced_accuracy(&manual, &scans);

    Ok(Json(AccuracyResponse {
        overall_accuracy: format!("{overall:.2}%"),
    }))
}
