//! Accuracy evaluation and model calibration
//!
//! The calibration feedback loop: compare manual lab reports against scan
//! results, and when the weighted agreement score drops below threshold,
//! refit the estimator's correction coefficients and persist them.

mod accuracy;
mod controller;
mod model;
mod worker;

pub use accuracy::{enhanced_accuracy, OUTLIER_THRESHOLD};
pub use controller::{CalibrationController, CalibrationError, CalibrationOutcome};
pub use model::{Model, ModelStore};
pub use worker::{spawn_worker, CalibrationRequest};
