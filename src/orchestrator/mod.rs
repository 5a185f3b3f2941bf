//! Periodic run driver over the collectors.
//!
//! Each cycle fans out over the active registry sources, pushes fresh
//! reports through the shared ingest pipeline, and records per-source
//! metrics. A hard wall clock bounds the cycle; collectors still in flight
//! at the deadline are cancelled and their partial output discarded.

use crate::collect::{self, rss::RssCollector, Collector, CollectorMetrics};
use crate::config::AppConfig;
use crate::fingerprint::report_fingerprint;
use crate::metrics::PipelineMetrics;
use crate::pipeline::{IngestError, IngestInput, IngestPipeline};
use crate::registry::{SourceDescriptor, SourceRegistry};
use crate::store::cache;
use crate::types::{IncidentStatus, RawReport, SourceRef};
use chrono::Utc;
use futures::future::join_all;
use sqlx::PgPool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Global cap on collectors in flight at once. Each collector holds one
/// permit for its whole run, and issues at most the per-source concurrency
/// configured in [`AppConfig`] of requests within it.
const MAX_PARALLEL_COLLECTORS: usize = 8;

/// Outcome of one orchestrator cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub sources_run: usize,
    pub reports_found: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Run the orchestrator as a background task.
pub async fn run_orchestrator(
    pool: PgPool,
    registry: Arc<SourceRegistry>,
    config: Arc<AppConfig>,
    pipeline: Arc<IngestPipeline>,
    metrics: Arc<PipelineMetrics>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.cycle_interval_secs));

    loop {
        interval.tick().await;

        let deadline = Duration::from_secs(config.cycle_deadline_secs);
        match tokio::time::timeout(
            deadline,
            run_cycle(&pool, &registry, &pipeline, &metrics),
        )
        .await
        {
            Ok(report) => {
                info!(
                    sources = report.sources_run,
                    found = report.reports_found,
                    ingested = report.ingested,
                    skipped = report.skipped,
                    errors = report.errors,
                    "Cycle complete"
                );
            }
            Err(_) => {
                warn!(deadline_secs = config.cycle_deadline_secs, "Cycle hit deadline, in-flight collectors cancelled");
            }
        }

        match cache::prune(&pool).await {
            Ok(pruned) if pruned > 0 => info!(pruned, "Scraper cache pruned"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Cache pruning failed"),
        }
    }
}

/// One full pass over the active sources.
pub async fn run_cycle(
    pool: &PgPool,
    registry: &Arc<SourceRegistry>,
    pipeline: &Arc<IngestPipeline>,
    metrics: &Arc<PipelineMetrics>,
) -> CycleReport {
    let http = match collect::build_http_client() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Could not build collector HTTP client");
            return CycleReport::default();
        }
    };

    let baseline = metrics.snapshot();
    let semaphore = Arc::new(Semaphore::new(MAX_PARALLEL_COLLECTORS));
    let mut tasks = Vec::new();

    for descriptor in registry.active_sources() {
        let Some(feed_url) = descriptor.feed_url.clone() else {
            continue;
        };
        let collector = RssCollector::new(
            &descriptor.key,
            &feed_url,
            Some(descriptor.lang.as_str()),
            http.clone(),
        );
        let descriptor = descriptor.clone();
        let semaphore = Arc::clone(&semaphore);
        let pool = pool.clone();
        let pipeline = Arc::clone(pipeline);
        let metrics = Arc::clone(metrics);

        tasks.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return CollectorMetrics {
                    source_key: descriptor.key.clone(),
                    found: 0,
                    errors: 1,
                    duration_ms: 0,
                },
            };
            run_source(&pool, &pipeline, &metrics, &descriptor, &collector).await
        }));
    }

    let mut report = CycleReport::default();
    for joined in join_all(tasks).await {
        match joined {
            Ok(source_metrics) => {
                report.sources_run += 1;
                report.reports_found += source_metrics.found;
                report.errors += source_metrics.errors;
                info!(
                    source = %source_metrics.source_key,
                    found = source_metrics.found,
                    errors = source_metrics.errors,
                    duration_ms = source_metrics.duration_ms,
                    "Collector run"
                );
            }
            Err(e) => {
                report.errors += 1;
                error!(error = %e, "Collector task panicked");
            }
        }
    }

    // Ingested/skipped accumulate on the shared counters as reports flow;
    // the cycle report carries this cycle's delta.
    let snap = metrics.snapshot();
    report.ingested = (snap.incidents_created + snap.incidents_merged
        - baseline.incidents_created
        - baseline.incidents_merged) as usize;
    report.skipped = (snap.cache_skipped - baseline.cache_skipped) as usize;
    report
}

/// Collect one source and push its fresh reports through the pipeline.
async fn run_source(
    pool: &PgPool,
    pipeline: &IngestPipeline,
    metrics: &PipelineMetrics,
    descriptor: &SourceDescriptor,
    collector: &dyn Collector,
) -> CollectorMetrics {
    let started = Instant::now();
    let mut found = 0usize;
    let mut errors = 0usize;

    match collector.collect().await {
        Ok(reports) => {
            found = reports.len();
            metrics
                .reports_found
                .fetch_add(reports.len() as u64, Ordering::Relaxed);

            for report in reports {
                if let Err(e) = process_report(pool, pipeline, metrics, descriptor, report).await {
                    warn!(source = %descriptor.key, error = %e, "Report processing failed");
                    errors += 1;
                    metrics.collector_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Err(e) => {
            warn!(source = %descriptor.key, error = %e, "Collector failed");
            errors += 1;
            metrics.collector_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    CollectorMetrics {
        source_key: descriptor.key.clone(),
        found,
        errors,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

/// Push one raw report through cache check → validation funnel → store.
///
/// Rejections are terminal for the report and cached so the next cycle
/// skips it; only store/infra failures bubble up as errors.
async fn process_report(
    pool: &PgPool,
    pipeline: &IngestPipeline,
    metrics: &PipelineMetrics,
    descriptor: &SourceDescriptor,
    report: RawReport,
) -> Result<(), IngestError> {
    let fingerprint = report_fingerprint(&report.source_url, &report.title);

    match cache::is_cached(pool, &fingerprint).await {
        Ok(true) => {
            metrics.cache_skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        Ok(false) => {}
        Err(e) => return Err(IngestError::Store(e)),
    }

    let occurred_at = report.published_at.unwrap_or_else(Utc::now);
    let input = IngestInput {
        title: report.title.clone(),
        narrative: report.body,
        occurred_at,
        lat: None,
        lon: None,
        asset_type: None,
        status: IncidentStatus::Active,
        country: None,
        sources: vec![SourceRef {
            source_url: report.source_url.clone(),
            source_type: descriptor.source_type,
            source_name: Some(descriptor.name.clone()),
            source_title: Some(report.title.clone()),
            source_quote: None,
            trust_weight: Some(descriptor.trust_weight),
            published_at: report.published_at,
            lang: report.lang.clone(),
        }],
        location_hint: report.location_hint,
        source_country: Some(descriptor.country.clone()),
        extra_keywords: descriptor.keywords.clone(),
    };

    let result = pipeline.ingest(input).await;
    match result {
        Ok(_) => {
            cache::record(pool, &fingerprint, report.published_at, &descriptor.name)
                .await
                .map_err(IngestError::Store)?;
            Ok(())
        }
        // Validation outcomes are terminal: cache them so the report is
        // not re-classified every cycle for 30 days.
        Err(
            IngestError::Rejected(_)
            | IngestError::Unlocatable(_)
            | IngestError::TriggerRejected(_)
            | IngestError::BadSourceUrl { .. }
            | IngestError::BadCoordinates { .. },
        ) => {
            cache::record(pool, &fingerprint, report.published_at, &descriptor.name)
                .await
                .map_err(IngestError::Store)?;
            Ok(())
        }
        Err(e @ IngestError::Store(_)) => Err(e),
    }
}
