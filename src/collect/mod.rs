//! Collectors: per-source adapters that fetch feeds and surface-extract
//! uniform [`RawReport`]s.
//!
//! A collector fetches and extracts, nothing more; deciding whether a
//! report describes an incident belongs to the validator. Collectors
//! tolerate per-source failure (one bad feed never aborts the cycle) and
//! emit a metrics record for every run, successful or not.

pub mod rss;

use crate::types::RawReport;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("feed parse failed: {0}")]
    Parse(String),
}

impl CollectError {
    /// Transient errors are retried with backoff; parse failures are not —
    /// the same bytes will not parse differently on a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, CollectError::Fetch(_))
    }
}

/// Per-run collector metrics, recorded regardless of outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CollectorMetrics {
    pub source_key: String,
    pub found: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

/// Uniform collector contract.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Registry key of the source this collector serves.
    fn key(&self) -> &str;

    /// Fetch the source once and return its current reports.
    async fn collect(&self) -> Result<Vec<RawReport>, CollectError>;
}

/// Wall timeout for a single feed request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry schedule for transient failures: initial delay, doubling per
/// attempt, bounded attempts.
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Build the shared outbound HTTP client for collectors.
pub fn build_http_client() -> Result<reqwest::Client, CollectError> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("dronewatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CollectError::Fetch(e.to_string()))
}

/// GET a URL as text, retrying transient failures with exponential backoff.
pub async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<String, CollectError> {
    let mut delay = RETRY_INITIAL_DELAY;
    let mut last_error = None;

    for attempt in 1..=RETRY_ATTEMPTS {
        match try_fetch(http, url).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() && attempt < RETRY_ATTEMPTS => {
                warn!(url, attempt, error = %e, "transient fetch failure, backing off");
                tokio::time::sleep(delay).await;
                delay *= 2;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| CollectError::Fetch("retries exhausted".to_string())))
}

async fn try_fetch(http: &reqwest::Client, url: &str) -> Result<String, CollectError> {
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| CollectError::Fetch(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(CollectError::Fetch(format!("status {status}")));
    }

    resp.text()
        .await
        .map_err(|e| CollectError::Fetch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_are_not_transient() {
        assert!(CollectError::Fetch("status 503".into()).is_transient());
        assert!(!CollectError::Parse("bad xml".into()).is_transient());
    }
}
