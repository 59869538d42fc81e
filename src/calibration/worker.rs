//! Background calibration worker
//!
//! Upload handlers fire a request into a bounded channel and move on; the
//! worker drains it one request at a time, which serializes every
//! read-refit-persist cycle on the model. Calibration failures are logged
//! here and never surface to a request.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::controller::{CalibrationController, CalibrationOutcome};

/// Request sent by the upload flow after a scan row commits
#[derive(Debug)]
pub enum CalibrationRequest {
    Evaluate,
}

/// Spawn the worker task, returning the channel to feed it.
///
/// A full channel means evaluation is already pending; senders may drop the
/// request (`try_send`) without losing anything, since the pending run will
/// see the same data.
pub fn spawn_worker(controller: Arc<CalibrationController>) -> mpsc::Sender<CalibrationRequest> {
    let (tx, mut rx) = mpsc::channel::<CalibrationRequest>(16);

    tokio::spawn(async move {
        while let Some(CalibrationRequest::Evaluate) = rx.recv().await {
            match controller.evaluate_and_calibrate().await {
                Ok(CalibrationOutcome::WithinTolerance { accuracy }) => {
                    debug!("Calibration check: accuracy {accuracy:.2}% within tolerance");
                }
                Ok(CalibrationOutcome::NoMatchedPairs { accuracy }) => {
                    debug!(
                        "Calibration check: accuracy {accuracy:.2}% but no manual/scan pairs yet"
                    );
                }
                Ok(CalibrationOutcome::Recalibrated {
                    accuracy,
                    coefficients,
                }) => {
                    info!(
                        "Calibration run complete: accuracy was {accuracy:.2}%, new coefficients {coefficients:?}"
                    );
                }
                Err(e) => {
                    error!("Calibration run failed: {e}");
                }
            }
        }
        debug!("Calibration worker shutting down");
    });

    tx
}
