//! Row types and queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::estimator::Composition;

/// One scan as returned by the history endpoint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScanSummary {
    pub sample_name: String,
    pub oil: f64,
    pub protein: f64,
    pub ffa: f64,
    pub upload_date: DateTime<Utc>,
}

/// Composition reading keyed by sample id, shared by manual and scan sides
/// of the accuracy comparison
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct SampleRecord {
    pub id: i64,
    pub oil: f64,
    pub protein: f64,
    pub ffa: f64,
}

/// Insert one scan row, returning its id
pub async fn insert_scan(
    pool: &SqlitePool,
    sample_name: &str,
    image_name: &str,
    composition: &Composition,
    uploaded_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO scans (sample_name, image_name, oil, protein, ffa, upload_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sample_name)
    .bind(image_name)
    .bind(composition.oil)
    .bind(composition.protein)
    .bind(composition.ffa)
    .bind(uploaded_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// The most recent scans, newest first
pub async fn recent_scans(pool: &SqlitePool, limit: u32) -> Result<Vec<ScanSummary>, sqlx::Error> {
    sqlx::query_as::<_, ScanSummary>(
        r#"
        SELECT sample_name, oil, protein, ffa, upload_date
        FROM scans
        ORDER BY upload_date DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await
}

/// All manual lab reports, keyed by the scan id they grade
pub async fn manual_reports(pool: &SqlitePool) -> Result<Vec<SampleRecord>, sqlx::Error> {
    sqlx::query_as::<_, SampleRecord>(
        "SELECT sample_id AS id, oil, protein, ffa FROM manual_reports",
    )
    .fetch_all(pool)
    .await
}

/// All scan readings, keyed by scan id
pub async fn scan_records(pool: &SqlitePool) -> Result<Vec<SampleRecord>, sqlx::Error> {
    sqlx::query_as::<_, SampleRecord>("SELECT id, oil, protein, ffa FROM scans")
        .fetch_all(pool)
        .await
}
