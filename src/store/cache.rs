//! Store-backed scraper cache.
//!
//! Keyed on the MD5 fingerprint of a processed raw report; entries younger
//! than the retention window short-circuit re-processing on later cycles.

use super::StoreError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Retention window for cache entries, in days.
pub const RETENTION_DAYS: i32 = 30;

/// Whether a report fingerprint was processed within the retention window.
pub async fn is_cached(pool: &PgPool, fingerprint: &str) -> Result<bool, StoreError> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"SELECT EXISTS(
               SELECT 1 FROM scraper_cache
                WHERE incident_hash = $1
                  AND processed_at > NOW() - make_interval(days => $2))"#,
    )
    .bind(fingerprint)
    .bind(RETENTION_DAYS)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Record a processed report. Re-processing the same fingerprint refreshes
/// the entry instead of failing.
pub async fn record(
    pool: &PgPool,
    fingerprint: &str,
    occurred_at: Option<DateTime<Utc>>,
    source_name: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"INSERT INTO scraper_cache (incident_hash, occurred_at, source_name)
           VALUES ($1, $2, $3)
           ON CONFLICT (incident_hash) DO UPDATE SET processed_at = NOW()"#,
    )
    .bind(fingerprint)
    .bind(occurred_at)
    .bind(source_name)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete entries older than the retention window. Returns rows removed.
pub async fn prune(pool: &PgPool) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "DELETE FROM scraper_cache WHERE processed_at < NOW() - make_interval(days => $1)",
    )
    .bind(RETENTION_DAYS)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
