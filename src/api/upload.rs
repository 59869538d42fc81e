//! Sample upload and analysis
//!
//! Upload flow: validate the multipart payload, save the image, run the
//! composition estimator, insert the scan row, then compute the current
//! accuracy for the response and hand a calibration request to the
//! background worker. Validation happens before anything touches disk;
//! calibration is best-effort and never fails the request.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::calibration::{enhanced_accuracy, CalibrationRequest};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::estimator::Composition;
use crate::AppState;

const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// Upload response body
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub results: Composition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// POST /api/upload
///
/// Multipart fields: `image` (jpeg/png/gif file) and `sampleName` (text).
pub async fn upload_sample(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut image: Option<(String, Vec<u8>)> = None;
    let mut sample_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart request: {e}")))?
    {
        match field.name() {
            Some("image") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::Validation("No file uploaded.".to_string()))?;

                let content_type = field.content_type().unwrap_or_default().to_string();
                if !ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str()) {
                    return Err(ApiError::UnsupportedMedia(format!(
                        "Invalid file type '{content_type}'. Only JPG, PNG, and GIF are allowed."
                    )));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read upload: {e}")))?;
                image = Some((file_name, data.to_vec()));
            }
            Some("sampleName") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read upload: {e}")))?;
                sample_name = Some(value);
            }
            _ => {}
        }
    }

    let (file_name, data) =
        image.ok_or_else(|| ApiError::Validation("No file uploaded.".to_string()))?;
    let sample_name = sample_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Sample name is required.".to_string()))?;

    // Keep the original upload name, stripped of any path components.
    // Collisions overwrite: last write wins.
    let file_name = Path::new(&file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ApiError::Validation("Invalid upload filename.".to_string()))?
        .to_string();
    let image_path = state.config.uploads_dir.join(&file_name);

    tokio::fs::write(&image_path, &data)
        .await
        .map_err(|e| ApiError::Storage(format!("Failed to save upload: {e}")))?;

    let model = state.model.current().await;
    let results = state.estimator.analyze(&image_path, &model)?;

    // A failure past this point keeps the saved file; an orphaned image is
    // an accepted limitation, file and row writes are not transactional.
    let scan_id = db::insert_scan(&state.db, &sample_name, &file_name, &results, Utc::now())
        .await
        .map_err(|e| ApiError::Storage(format!("Failed to save data to the database: {e}")))?;

    info!("Analyzed sample '{sample_name}' as scan {scan_id}: {results:?}");

    // Best-effort from here on: the scan is committed, accuracy and
    // calibration must not fail the request.
    let accuracy = match current_accuracy(&state).await {
        Ok(accuracy) => Some(accuracy),
        Err(e) => {
            warn!("Could not compute accuracy for upload response: {e}");
            None
        }
    };

    if state.calibration.try_send(CalibrationRequest::Evaluate).is_err() {
        // Channel full: an evaluation is already pending and will see this scan
        warn!("Calibration queue full, skipping trigger for scan {scan_id}");
    }

    Ok(Json(UploadResponse {
        message: "Analysis complete and data saved successfully.".to_string(),
        results,
        accuracy,
    }))
}

async fn current_accuracy(state: &AppState) -> Result<f64, sqlx::Error> {
    let manual = db::manual_reports(&state.db).await?;
    let scans = db::scan_records(&state.db).await?;
    Ok(enhanced_accuracy(&manual, &scans))
}
