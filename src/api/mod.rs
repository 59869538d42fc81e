//! HTTP API handlers

pub mod accuracy;
pub mod health;
pub mod samples;
pub mod upload;

pub use accuracy::get_enhanced_accuracy;
pub use health::health_check;
pub use samples::last_samples;
pub use upload::upload_sample;
