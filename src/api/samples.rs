//! Recent sample history

use axum::extract::State;
use axum::Json;

use crate::db::{self, ScanSummary};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/last-samples
///
/// The most recent scans, newest first. The row count bound is
/// configuration (`history_limit`), not a stable API guarantee.
pub async fn last_samples(State(state): State<AppState>) -> ApiResult<Json<Vec<ScanSummary>>> {
    let rows = db::recent_scans(&state.db, state.config.history_limit).await?;
    Ok(Json(rows))
}
