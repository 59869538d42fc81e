//! Calibration controller
//!
//! Fetches the current manual/scan data, computes overall enhanced accuracy,
//! and when it falls below threshold refits the model's correction
//! coefficients from the signed per-pair errors, persisting the model and
//! appending one entry to the calibration log. The refit is deterministic:
//! repeating it over unchanged data reproduces the same coefficients.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::accuracy::enhanced_accuracy;
use super::model::ModelStore;
use crate::db::{self, SampleRecord};

/// Calibration failure. Internal only: the worker logs these, they never
/// reach an HTTP response.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to persist model: {0}")]
    Persist(String),

    #[error("Failed to append calibration log: {0}")]
    Log(String),
}

/// Signed manual-minus-scan error for one matched pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairError {
    pub sample_id: i64,
    pub oil: f64,
    pub protein: f64,
    pub ffa: f64,
}

/// One line of the append-only calibration log
#[derive(Debug, Serialize, Deserialize)]
pub struct CalibrationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub errors: Vec<PairError>,
    pub coefficients: Vec<f64>,
}

/// What a calibration run decided
#[derive(Debug)]
pub enum CalibrationOutcome {
    /// Accuracy at or above threshold, nothing to do
    WithinTolerance { accuracy: f64 },
    /// Accuracy below threshold but no manual/scan pair to fit against
    NoMatchedPairs { accuracy: f64 },
    /// Coefficients refit and persisted
    Recalibrated { accuracy: f64, coefficients: Vec<f64> },
}

pub struct CalibrationController {
    db: SqlitePool,
    model: Arc<ModelStore>,
    log_path: PathBuf,
    threshold: f64,
}

impl CalibrationController {
    pub fn new(db: SqlitePool, model: Arc<ModelStore>, log_path: PathBuf, threshold: f64) -> Self {
        CalibrationController {
            db,
            model,
            log_path,
            threshold,
        }
    }

    /// Evaluate current accuracy and recalibrate if it is below threshold
    pub async fn evaluate_and_calibrate(&self) -> Result<CalibrationOutcome, CalibrationError> {
        let manual = db::manual_reports(&self.db)
            .await
            .map_err(|e| CalibrationError::Storage(e.to_string()))?;
        let scans = db::scan_records(&self.db)
            .await
            .map_err(|e| CalibrationError::Storage(e.to_string()))?;

        let accuracy = enhanced_accuracy(&manual, &scans);
        if accuracy >= self.threshold {
            debug!("Accuracy {accuracy:.2}% within tolerance, no calibration needed");
            return Ok(CalibrationOutcome::WithinTolerance { accuracy });
        }

        let errors = pair_errors(&manual, &scans);
        if errors.is_empty() {
            debug!("Accuracy {accuracy:.2}% below threshold but no matched pairs to fit");
            return Ok(CalibrationOutcome::NoMatchedPairs { accuracy });
        }

        let coefficients = fit_offsets(&errors);
        let model = self.model.replace(coefficients.clone()).await?;
        self.append_log(&errors, &model.coefficients).await?;

        info!(
            "Recalibrated model from {} pairs (accuracy was {accuracy:.2}%): {coefficients:?}",
            errors.len()
        );
        Ok(CalibrationOutcome::Recalibrated {
            accuracy,
            coefficients,
        })
    }

    async fn append_log(
        &self,
        errors: &[PairError],
        coefficients: &[f64],
    ) -> Result<(), CalibrationError> {
        let entry = CalibrationLogEntry {
            timestamp: Utc::now(),
            errors: errors.to_vec(),
            coefficients: coefficients.to_vec(),
        };
        let mut line =
            serde_json::to_string(&entry).map_err(|e| CalibrationError::Log(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(|e| CalibrationError::Log(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| CalibrationError::Log(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| CalibrationError::Log(e.to_string()))?;
        Ok(())
    }
}

/// Signed per-field errors (manual - scan) for every matched pair
fn pair_errors(manual: &[SampleRecord], scans: &[SampleRecord]) -> Vec<PairError> {
    manual
        .iter()
        .filter_map(|entry| {
            scans.iter().find(|s| s.id == entry.id).map(|scan| PairError {
                sample_id: entry.id,
                oil: entry.oil - scan.oil,
                protein: entry.protein - scan.protein,
                ffa: entry.ffa - scan.ffa,
            })
        })
        .collect()
}

/// Offset-only least-squares fit: for each field the offset minimizing the
/// sum of squared residuals over the observed errors is their mean.
fn fit_offsets(errors: &[PairError]) -> Vec<f64> {
    let n = errors.len() as f64;
    vec![
        errors.iter().map(|e| e.oil).sum::<f64>() / n,
        errors.iter().map(|e| e.protein).sum::<f64>() / n,
        errors.iter().map(|e| e.ffa).sum::<f64>() / n,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, oil: f64, protein: f64, ffa: f64) -> SampleRecord {
        SampleRecord {
            id,
            oil,
            protein,
            ffa,
        }
    }

    #[test]
    fn pair_errors_are_signed_manual_minus_scan() {
        let manual = vec![record(1, 10.0, 50.0, 40.0)];
        let scans = vec![record(1, 9.0, 52.0, 40.0)];
        let errors = pair_errors(&manual, &scans);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].oil, 1.0);
        assert_eq!(errors[0].protein, -2.0);
        assert_eq!(errors[0].ffa, 0.0);
    }

    #[test]
    fn unmatched_records_produce_no_errors() {
        let manual = vec![record(1, 10.0, 50.0, 40.0)];
        let scans = vec![record(7, 9.0, 50.0, 40.0)];
        assert!(pair_errors(&manual, &scans).is_empty());
    }

    #[test]
    fn fit_is_the_mean_error_per_field() {
        let errors = vec![
            PairError {
                sample_id: 1,
                oil: 1.0,
                protein: -2.0,
                ffa: 0.0,
            },
            PairError {
                sample_id: 2,
                oil: 3.0,
                protein: 2.0,
                ffa: 1.0,
            },
        ];
        assert_eq!(fit_offsets(&errors), vec![2.0, 0.0, 0.5]);
    }

    #[test]
    fn fit_is_deterministic_over_unchanged_data() {
        let manual = vec![record(1, 10.0, 50.0, 40.0), record(2, 9.0, 45.0, 30.0)];
        let scans = vec![record(1, 9.0, 52.0, 40.0), record(2, 9.5, 46.0, 28.0)];
        let first = fit_offsets(&pair_errors(&manual, &scans));
        let second = fit_offsets(&pair_errors(&manual, &scans));
        assert_eq!(first, second);
    }
}
