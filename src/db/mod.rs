//! Database access layer
//!
//! SQLite via sqlx with a bounded connection pool. Two tables:
//! - `scans`: one row per analyzed sample, immutable once written
//! - `manual_reports`: ground-truth lab measurements, entered outside this
//!   service and read-only here

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

mod models;
pub use models::{
    insert_scan, manual_reports, recent_scans, scan_records, SampleRecord, ScanSummary,
};

/// Open (creating if needed) the database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc creates the database file on first run
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers while an upload is inserting
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create tables if they do not exist (idempotent, safe to call repeatedly)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sample_name TEXT NOT NULL,
            image_name TEXT NOT NULL,
            oil REAL NOT NULL,
            protein REAL NOT NULL,
            ffa REAL NOT NULL,
            upload_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Populated by the lab reporting workflow, never written by this service
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manual_reports (
            sample_id INTEGER PRIMARY KEY,
            oil REAL NOT NULL,
            protein REAL NOT NULL,
            ffa REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
