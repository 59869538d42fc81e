//! Estimator correction model and its file-backed store
//!
//! The model is process-wide singleton state: loaded (or initially trained)
//! at startup, mutated only by the calibration controller, rewritten to disk
//! after every mutation. All mutation goes through a single async lock so a
//! read-refit-persist cycle is atomic; racing recalibrations degrade to
//! last-write-wins of whole coefficient vectors.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use super::controller::CalibrationError;
use crate::estimator::Composition;

/// Per-field additive corrections: [oil, protein, ffa]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub coefficients: Vec<f64>,
    pub trained_at: DateTime<Utc>,
}

impl Model {
    /// The identity correction produced by initial training
    pub fn identity() -> Self {
        Model {
            coefficients: vec![0.0, 0.0, 0.0],
            trained_at: Utc::now(),
        }
    }

    fn offset(&self, index: usize) -> f64 {
        self.coefficients.get(index).copied().unwrap_or(0.0)
    }

    /// Apply the offset corrections to a raw reading, clamped at zero and
    /// rounded to two decimals
    pub fn apply(&self, raw: Composition) -> Composition {
        Composition {
            oil: round2((raw.oil + self.offset(0)).max(0.0)),
            protein: round2((raw.protein + self.offset(1)).max(0.0)),
            ffa: round2((raw.ffa + self.offset(2)).max(0.0)),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// File-backed model store, single writer
pub struct ModelStore {
    path: PathBuf,
    inner: Mutex<Model>,
}

impl ModelStore {
    /// Load the persisted model, or train and persist an initial one
    pub async fn open(path: &Path) -> Result<Self> {
        let model = if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read model file {}", path.display()))?;
            let model: Model = serde_json::from_str(&content)
                .with_context(|| format!("Malformed model file {}", path.display()))?;
            info!(
                "Loaded existing model ({} coefficients, trained {})",
                model.coefficients.len(),
                model.trained_at
            );
            model
        } else {
            let model = Model::identity();
            write_model(path, &model).await?;
            info!("Trained and saved new model: {}", path.display());
            model
        };

        Ok(ModelStore {
            path: path.to_path_buf(),
            inner: Mutex::new(model),
        })
    }

    /// Snapshot of the current model
    pub async fn current(&self) -> Model {
        self.inner.lock().await.clone()
    }

    /// Replace the coefficient vector, persisting before the lock is released
    pub async fn replace(&self, coefficients: Vec<f64>) -> Result<Model, CalibrationError> {
        let mut guard = self.inner.lock().await;
        let model = Model {
            coefficients,
            trained_at: Utc::now(),
        };
        write_model(&self.path, &model)
            .await
            .map_err(|e| CalibrationError::Persist(e.to_string()))?;
        *guard = model.clone();
        Ok(model)
    }
}

async fn write_model(path: &Path, model: &Model) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write model file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_model_leaves_readings_unchanged() {
        let raw = Composition {
            oil: 9.13,
            protein: 48.5,
            ffa: 22.0,
        };
        assert_eq!(Model::identity().apply(raw), raw);
    }

    #[test]
    fn offsets_are_applied_per_field_and_clamped() {
        let model = Model {
            coefficients: vec![0.5, -1.0, -30.0],
            trained_at: Utc::now(),
        };
        let corrected = model.apply(Composition {
            oil: 9.0,
            protein: 50.0,
            ffa: 10.0,
        });
        assert_eq!(corrected.oil, 9.5);
        assert_eq!(corrected.protein, 49.0);
        // Clamped at zero rather than going negative
        assert_eq!(corrected.ffa, 0.0);
    }

    #[test]
    fn short_coefficient_vector_defaults_missing_offsets_to_zero() {
        let model = Model {
            coefficients: vec![1.0],
            trained_at: Utc::now(),
        };
        let corrected = model.apply(Composition {
            oil: 8.0,
            protein: 50.0,
            ffa: 20.0,
        });
        assert_eq!(corrected.oil, 9.0);
        assert_eq!(corrected.protein, 50.0);
        assert_eq!(corrected.ffa, 20.0);
    }

    #[tokio::test]
    async fn open_trains_identity_model_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let store = ModelStore::open(&path).await.expect("open");
        assert!(path.exists());
        assert_eq!(store.current().await.coefficients, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn replace_persists_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let store = ModelStore::open(&path).await.expect("open");
        store
            .replace(vec![0.4, -0.2, 1.1])
            .await
            .expect("replace");

        let reloaded = ModelStore::open(&path).await.expect("reopen");
        assert_eq!(reloaded.current().await.coefficients, vec![0.4, -0.2, 1.1]);
    }

    #[tokio::test]
    async fn open_rejects_malformed_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(ModelStore::open(&path).await.is_err());
    }
}
