//! Composition estimation
//!
//! The estimator maps an uploaded sample image to oil/protein/free-fatty-acid
//! percentages. It is an injectable trait so the surrounding request flow can
//! be tested without a real vision model; the shipped implementation
//! ([`SimulatedEstimator`]) is a stand-in that must be replaced for any
//! production use.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::calibration::Model;

mod simulated;
pub use simulated::SimulatedEstimator;

/// Domain upper bounds for a plausible oilseed sample
pub const MAX_OIL: f64 = 12.0;
pub const MAX_PROTEIN: f64 = 60.0;
pub const MAX_FFA: f64 = 50.0;

/// Estimated chemical composition, all fields in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Composition {
    pub oil: f64,
    pub protein: f64,
    pub ffa: f64,
}

/// Estimation failure
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// The image reference does not resolve to readable image data
    #[error("Image not readable: {0}")]
    InvalidInput(String),

    /// A produced value exceeds its domain bound
    #[error("{field} content {value:.2}% exceeds maximum allowed {max:.2}%")]
    OutOfRange {
        field: &'static str,
        value: f64,
        max: f64,
    },
}

/// Black-box composition estimator
///
/// Implementations read the image at `image_path` and produce a composition
/// corrected by the model's current coefficients. No side effects beyond
/// reading the image.
pub trait CompositionEstimator: Send + Sync {
    fn analyze(&self, image_path: &Path, model: &Model) -> Result<Composition, EstimatorError>;
}

/// Reject any composition exceeding the domain bounds
pub fn validate_composition(composition: &Composition) -> Result<(), EstimatorError> {
    let checks = [
        ("Oil", composition.oil, MAX_OIL),
        ("Protein", composition.protein, MAX_PROTEIN),
        ("FFA", composition.ffa, MAX_FFA),
    ];
    for (field, value, max) in checks {
        if value > max {
            return Err(EstimatorError::OutOfRange { field, value, max });
        }
    }
    Ok(())
}
