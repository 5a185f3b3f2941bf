//! The ingest pipeline: validator → geocoder → bounds → deduper → store.
//!
//! One entry point serves both the HTTP ingest endpoint and the
//! orchestrator's collector cycles, so every admission runs the same funnel
//! in the same order. All writes for one report happen in one transaction;
//! a lost insert race (concurrent report of the same event) rolls back and
//! retries once as a merge against the winning row.

use crate::dedupe::{self, DedupOutcome};
use crate::geo::{self, GeocodeError, Geocoder};
use crate::metrics::PipelineMetrics;
use crate::registry::SourceRegistry;
use crate::store::incidents::{self, Fingerprints};
use crate::store::{is_unique_violation, sources, StoreError};
use crate::types::{AssetType, IncidentCandidate, IncidentStatus, SourceRef};
use crate::validate::{url::validate_public_url, RejectReason, Validator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("bad source url {url}: {reason}")]
    BadSourceUrl { url: String, reason: String },

    #[error("implausible coordinates ({lat}, {lon})")]
    BadCoordinates { lat: f64, lon: f64 },

    #[error("location could not be resolved: {0}")]
    Unlocatable(#[from] GeocodeError),

    #[error("report rejected: {0}")]
    Rejected(RejectReason),

    #[error("store validation rejected row: {0}")]
    TriggerRejected(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

/// Whether an admitted report created a new incident or merged into an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestAction {
    Created,
    Merged,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    pub id: Uuid,
    pub action: IngestAction,
}

/// Everything the pipeline needs to know about one report. Coordinates and
/// asset type are optional; when absent they come from the geocoder.
#[derive(Debug, Clone)]
pub struct IngestInput {
    pub title: String,
    pub narrative: String,
    pub occurred_at: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub asset_type: Option<AssetType>,
    pub status: IncidentStatus,
    pub country: Option<String>,
    pub sources: Vec<SourceRef>,
    /// Pre-extracted location string from the collector, if any.
    pub location_hint: Option<String>,
    /// Country of the reporting source, for geocoder tie-breaks.
    pub source_country: Option<String>,
    /// Per-source keyword whitelist from the registry.
    pub extra_keywords: Vec<String>,
}

enum StoreAttempt {
    Done(IngestOutcome),
    /// Insert lost a uniqueness race; resolve again as a merge.
    LostRace,
}

pub struct IngestPipeline {
    pool: PgPool,
    registry: Arc<SourceRegistry>,
    validator: Validator,
    geocoder: Geocoder,
    metrics: Arc<PipelineMetrics>,
}

impl IngestPipeline {
    pub fn new(
        pool: PgPool,
        registry: Arc<SourceRegistry>,
        validator: Validator,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let geocoder = Geocoder::new(Arc::clone(&registry));
        Self {
            pool,
            registry,
            validator,
            geocoder,
            metrics,
        }
    }

    /// Run one report through the full funnel.
    pub async fn ingest(&self, input: IngestInput) -> Result<IngestOutcome, IngestError> {
        if input.sources.is_empty() {
            return Err(IngestError::BadSourceUrl {
                url: String::new(),
                reason: "at least one source is required".to_string(),
            });
        }
        for source in &input.sources {
            validate_public_url(&source.source_url).map_err(|e| IngestError::BadSourceUrl {
                url: source.source_url.clone(),
                reason: e.to_string(),
            })?;
        }

        // Layers 1–3.
        let admission = self
            .validator
            .validate_text(&input.title, &input.narrative, &input.extra_keywords)
            .await
            .map_err(|reason| {
                self.metrics.record_rejection(&reason);
                IngestError::Rejected(reason)
            })?;
        if admission.degraded {
            self.metrics
                .degraded_admissions
                .fetch_add(1, Ordering::Relaxed);
        }

        // Coordinates: trust the caller's, geocode otherwise.
        let (lat, lon, asset_type) = match (input.lat, input.lon) {
            (Some(lat), Some(lon)) => {
                if !geo::plausible_coordinates(lat, lon) {
                    return Err(IngestError::BadCoordinates { lat, lon });
                }
                (lat, lon, input.asset_type.unwrap_or(AssetType::Other))
            }
            _ => {
                let hint = input.location_hint.as_deref().unwrap_or("");
                let resolved = self
                    .geocoder
                    .resolve(
                        &[hint, input.title.as_str(), input.narrative.as_str()],
                        input.source_country.as_deref(),
                    )
                    .map_err(|e| {
                        self.metrics
                            .rejected_geocode
                            .fetch_add(1, Ordering::Relaxed);
                        IngestError::Unlocatable(e)
                    })?;
                (
                    resolved.lat,
                    resolved.lon,
                    input.asset_type.unwrap_or(resolved.asset_type),
                )
            }
        };

        // Layer 4: European bounds.
        Validator::check_bounds(lat, lon).map_err(|reason| {
            self.metrics.record_rejection(&reason);
            IngestError::Rejected(reason)
        })?;

        let candidate = IncidentCandidate {
            title: input.title,
            narrative: input.narrative,
            occurred_at: input.occurred_at,
            lat,
            lon,
            asset_type,
            status: input.status,
            country: input
                .country
                .or_else(|| Some(geo::country_for(lat, lon).to_string())),
            sources: input.sources,
        };
        let fingerprints = dedupe::fingerprints_for(&candidate);

        // Two attempts: the second only runs after a lost insert race, at
        // which point the content hash is guaranteed to resolve to a row.
        for _attempt in 0..2 {
            match self.try_store(&candidate, &fingerprints).await? {
                StoreAttempt::Done(outcome) => {
                    match outcome.action {
                        IngestAction::Created => {
                            self.metrics
                                .incidents_created
                                .fetch_add(1, Ordering::Relaxed);
                        }
                        IngestAction::Merged => {
                            self.metrics
                                .incidents_merged
                                .fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    info!(
                        incident_id = %outcome.id,
                        action = ?outcome.action,
                        degraded = admission.degraded,
                        confidence = admission.confidence,
                        "Report ingested"
                    );
                    return Ok(outcome);
                }
                StoreAttempt::LostRace => {
                    warn!(content_hash = %fingerprints.content_hash, "Insert lost race, retrying as merge");
                }
            }
        }

        Err(IngestError::Store(StoreError::Db(sqlx::Error::Protocol(
            "dedup retry did not converge".to_string(),
        ))))
    }

    /// One transactional store attempt: dedup decision, row write, source
    /// attachments.
    async fn try_store(
        &self,
        candidate: &IncidentCandidate,
        fingerprints: &Fingerprints,
    ) -> Result<StoreAttempt, IngestError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IngestError::Store(StoreError::Db(e)))?;

        let outcome = dedupe::resolve(&mut tx, candidate, fingerprints)
            .await
            .map_err(IngestError::Store)?;

        let (id, action) = match outcome {
            DedupOutcome::New => {
                match incidents::insert_incident(&mut tx, candidate, fingerprints).await {
                    Ok(id) => (id, IngestAction::Created),
                    Err(StoreError::Db(e)) if is_unique_violation(&e, None) => {
                        // Concurrent writer won the content-hash barrier.
                        let _ = tx.rollback().await;
                        return Ok(StoreAttempt::LostRace);
                    }
                    Err(StoreError::ValidationRejected(reason)) => {
                        let _ = tx.rollback().await;
                        return Err(IngestError::TriggerRejected(reason));
                    }
                    Err(e) => {
                        let _ = tx.rollback().await;
                        return Err(IngestError::Store(e));
                    }
                }
            }
            DedupOutcome::MergeInto(existing) => {
                match incidents::lock_incident(&mut tx, existing).await {
                    Ok(()) => {}
                    Err(StoreError::NotFound(_)) => {
                        // The row vanished between lookup and lock; start over.
                        let _ = tx.rollback().await;
                        return Ok(StoreAttempt::LostRace);
                    }
                    Err(e) => {
                        let _ = tx.rollback().await;
                        return Err(IngestError::Store(e));
                    }
                }
                incidents::merge_incident(&mut tx, existing, candidate)
                    .await
                    .map_err(|e| match e {
                        StoreError::ValidationRejected(reason) => {
                            IngestError::TriggerRejected(reason)
                        }
                        other => IngestError::Store(other),
                    })?;
                (existing, IngestAction::Merged)
            }
        };

        for source in &candidate.sources {
            let source_id = sources::resolve_or_register(&mut tx, source, &self.registry)
                .await
                .map_err(IngestError::Store)?;
            incidents::attach_source(&mut tx, id, source_id, source)
                .await
                .map_err(IngestError::Store)?;
        }

        tx.commit()
            .await
            .map_err(|e| IngestError::Store(StoreError::Db(e)))?;

        Ok(StoreAttempt::Done(IngestOutcome { id, action }))
    }
}
