//! oleoscan - oilseed composition scan service
//!
//! HTTP service: upload a sample image, persist the composition estimate,
//! report recent scans and manual-vs-scan accuracy.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use oleoscan::calibration::{spawn_worker, CalibrationController, ModelStore};
use oleoscan::config::{Cli, Config};
use oleoscan::estimator::SimulatedEstimator;
use oleoscan::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before any database delays
    info!(
        "Starting oleoscan v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let config = Arc::new(Config::resolve(&cli));
    config.ensure_directories()?;
    info!("Data directory: {}", config.data_dir.display());

    let pool = db::init_database(&config.db_path).await?;

    let model = Arc::new(ModelStore::open(&config.model_path).await?);

    let controller = Arc::new(CalibrationController::new(
        pool.clone(),
        Arc::clone(&model),
        config.calibration_log_path.clone(),
        config.accuracy_threshold,
    ));
    let calibration_tx = spawn_worker(controller);

    let state = AppState::new(
        pool,
        Arc::clone(&config),
        Arc::new(SimulatedEstimator),
        model,
        calibration_tx,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("oleoscan listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
