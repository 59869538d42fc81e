//! Simulated composition estimator
//!
//! Draws raw readings from plausible per-field ranges, then applies the
//! model's offset corrections. A placeholder for a real vision model: the
//! request flow, persistence, and calibration loop around it are all real.

use std::path::Path;

use rand::Rng;

use super::{validate_composition, Composition, CompositionEstimator, EstimatorError};
use crate::calibration::Model;

pub struct SimulatedEstimator;

impl CompositionEstimator for SimulatedEstimator {
    fn analyze(&self, image_path: &Path, model: &Model) -> Result<Composition, EstimatorError> {
        let metadata = std::fs::metadata(image_path)
            .map_err(|_| EstimatorError::InvalidInput(image_path.display().to_string()))?;
        if metadata.len() == 0 {
            return Err(EstimatorError::InvalidInput(format!(
                "{} is empty",
                image_path.display()
            )));
        }

        let mut rng = rand::thread_rng();
        let raw = Composition {
            oil: rng.gen_range(8.0..10.0),
            protein: rng.gen_range(40.0..60.0),
            ffa: rng.gen_range(0.0..50.0),
        };

        let corrected = model.apply(raw);
        validate_composition(&corrected)?;
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_image_is_invalid_input() {
        let err = SimulatedEstimator
            .analyze(Path::new("/nonexistent/sample.jpg"), &Model::identity())
            .unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidInput(_)));
    }

    #[test]
    fn empty_image_is_invalid_input() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = SimulatedEstimator
            .analyze(file.path(), &Model::identity())
            .unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidInput(_)));
    }

    #[test]
    fn identity_model_yields_in_bounds_readings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xFF\xD8\xFF\xE0 not a real jpeg").unwrap();

        for _ in 0..50 {
            let c = SimulatedEstimator
                .analyze(file.path(), &Model::identity())
                .expect("analysis");
            assert!(c.oil >= 8.0 && c.oil <= super::super::MAX_OIL);
            assert!(c.protein >= 40.0 && c.protein <= super::super::MAX_PROTEIN);
            assert!(c.ffa >= 0.0 && c.ffa <= super::super::MAX_FFA);
        }
    }
}
