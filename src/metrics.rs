//! Pipeline metric counters.
//!
//! The only mutable process-wide state besides the HTTP client pool:
//! plain atomics, incremented by the orchestrator and the ingest path,
//! snapshotted by the metrics endpoint.

use crate::validate::RejectReason;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub reports_found: AtomicU64,
    pub cache_skipped: AtomicU64,
    pub rejected_not_incident: AtomicU64,
    pub rejected_foreign: AtomicU64,
    pub rejected_geocode: AtomicU64,
    pub rejected_bounds: AtomicU64,
    pub degraded_admissions: AtomicU64,
    pub incidents_created: AtomicU64,
    pub incidents_merged: AtomicU64,
    pub collector_errors: AtomicU64,
}

/// Point-in-time view of the counters, serialized by `/api/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub reports_found: u64,
    pub cache_skipped: u64,
    pub rejected_not_incident: u64,
    pub rejected_foreign: u64,
    pub rejected_geocode: u64,
    pub rejected_bounds: u64,
    pub degraded_admissions: u64,
    pub incidents_created: u64,
    pub incidents_merged: u64,
    pub collector_errors: u64,
}

impl PipelineMetrics {
    pub fn record_rejection(&self, reason: &RejectReason) {
        let counter = match reason {
            RejectReason::NotAnIncident { .. } => &self.rejected_not_incident,
            RejectReason::ForeignKeyword { .. } => &self.rejected_foreign,
            RejectReason::OutOfBounds { .. } => &self.rejected_bounds,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_found: self.reports_found.load(Ordering::Relaxed),
            cache_skipped: self.cache_skipped.load(Ordering::Relaxed),
            rejected_not_incident: self.rejected_not_incident.load(Ordering::Relaxed),
            rejected_foreign: self.rejected_foreign.load(Ordering::Relaxed),
            rejected_geocode: self.rejected_geocode.load(Ordering::Relaxed),
            rejected_bounds: self.rejected_bounds.load(Ordering::Relaxed),
            degraded_admissions: self.degraded_admissions.load(Ordering::Relaxed),
            incidents_created: self.incidents_created.load(Ordering::Relaxed),
            incidents_merged: self.incidents_merged.load(Ordering::Relaxed),
            collector_errors: self.collector_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_land_on_the_right_counter() {
        let metrics = PipelineMetrics::default();
        metrics.record_rejection(&RejectReason::ForeignKeyword {
            token: "ukraina".to_string(),
        });
        metrics.record_rejection(&RejectReason::NotAnIncident {
            detail: "no drone keyword".to_string(),
        });
        metrics.record_rejection(&RejectReason::OutOfBounds {
            lat: 41.88,
            lon: -87.63,
        });

        let snap = metrics.snapshot();
        assert_eq!(snap.rejected_foreign, 1);
        assert_eq!(snap.rejected_not_incident, 1);
        assert_eq!(snap.rejected_bounds, 1);
        assert_eq!(snap.incidents_created, 0);
    }
}
