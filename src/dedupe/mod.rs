//! Spatio-temporal deduplication.
//!
//! A validated, geocoded report resolves to one of two outcomes: it is a
//! new incident, or it folds into an existing one. The decision runs inside
//! the caller's transaction so the content-hash lookup, the spatial match,
//! and the eventual merge serialize on the incident row.

use crate::fingerprint;
use crate::geo::haversine_m;
use crate::store::incidents::{self, Fingerprints};
use crate::store::StoreError;
use crate::types::{AssetType, IncidentCandidate};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Maximum time between reports of the same physical event.
pub const MERGE_WINDOW_DAYS: i64 = 7;

/// Dedup decision for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    New,
    MergeInto(Uuid),
}

/// Compute the candidate's fingerprints per the canonical forms.
pub fn fingerprints_for(candidate: &IncidentCandidate) -> Fingerprints {
    let normalized_title = fingerprint::normalize_title(&candidate.title);
    Fingerprints {
        location_hash: fingerprint::location_hash(
            candidate.lon,
            candidate.lat,
            candidate.asset_type,
        ),
        content_hash: fingerprint::content_hash(
            candidate.occurred_at,
            candidate.lon,
            candidate.lat,
            &normalized_title,
            candidate.asset_type,
        ),
        normalized_title,
    }
}

/// Resolve a candidate against the store: content hash first, then the
/// spatial-temporal nearest match.
pub async fn resolve(
    tx: &mut Transaction<'_, Postgres>,
    candidate: &IncidentCandidate,
    fingerprints: &Fingerprints,
) -> Result<DedupOutcome, StoreError> {
    if let Some(id) = incidents::find_by_content_hash(tx, &fingerprints.content_hash).await? {
        return Ok(DedupOutcome::MergeInto(id));
    }

    if let Some(id) = incidents::find_nearby(
        tx,
        candidate.lat,
        candidate.lon,
        candidate.asset_type,
        candidate.occurred_at,
    )
    .await?
    {
        return Ok(DedupOutcome::MergeInto(id));
    }

    Ok(DedupOutcome::New)
}

/// Pure mirror of the spatial-temporal match used by `find_nearby_incident`
/// in SQL; kept for tests of the radius and window boundaries.
pub fn is_spatial_merge(
    asset_type: AssetType,
    candidate: (f64, f64, DateTime<Utc>),
    existing: (f64, f64, DateTime<Utc>),
) -> bool {
    let (lat_a, lon_a, at_a) = candidate;
    let (lat_b, lon_b, at_b) = existing;

    let distance = haversine_m(lat_a, lon_a, lat_b, lon_b);
    if distance > asset_type.merge_radius_m() {
        return false;
    }

    let delta = (at_a - at_b).num_seconds().abs();
    delta <= Duration::days(MERGE_WINDOW_DAYS).num_seconds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const AALBORG_AIRPORT: (f64, f64) = (57.093, 9.849);

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 24, hour, 0, 0).unwrap()
    }

    fn km_north(base: (f64, f64), km: f64) -> (f64, f64) {
        // 1 degree of latitude is ~111.19 km
        (base.0 + km / 111.19, base.1)
    }

    #[test]
    fn airport_reports_within_radius_merge() {
        let near = km_north(AALBORG_AIRPORT, 2.9);
        assert!(is_spatial_merge(
            AssetType::Airport,
            (near.0, near.1, at(8)),
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, at(6)),
        ));
    }

    #[test]
    fn airport_reports_outside_radius_stay_separate() {
        let far = km_north(AALBORG_AIRPORT, 3.1);
        assert!(!is_spatial_merge(
            AssetType::Airport,
            (far.0, far.1, at(8)),
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, at(6)),
        ));
    }

    #[test]
    fn tighter_assets_use_tighter_radii() {
        let near = km_north(AALBORG_AIRPORT, 0.8);
        // 800 m: inside a powerplant radius, outside an "other" radius
        assert!(is_spatial_merge(
            AssetType::Powerplant,
            (near.0, near.1, at(8)),
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, at(6)),
        ));
        assert!(!is_spatial_merge(
            AssetType::Other,
            (near.0, near.1, at(8)),
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, at(6)),
        ));
    }

    #[test]
    fn six_days_apart_merges_eight_days_does_not() {
        let base = Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let six_days = base + Duration::days(6);
        let eight_days = base + Duration::days(8);

        assert!(is_spatial_merge(
            AssetType::Airport,
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, six_days),
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, base),
        ));
        assert!(!is_spatial_merge(
            AssetType::Airport,
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, eight_days),
            (AALBORG_AIRPORT.0, AALBORG_AIRPORT.1, base),
        ));
    }

    #[test]
    fn fingerprints_are_deterministic_for_a_candidate() {
        let candidate = IncidentCandidate {
            title: "Droner over Aalborg Lufthavn".to_string(),
            narrative: "Politiet modtog flere anmeldelser.".to_string(),
            occurred_at: at(2),
            lat: 57.093,
            lon: 9.849,
            asset_type: AssetType::Airport,
            status: crate::types::IncidentStatus::Active,
            country: Some("DK".to_string()),
            sources: Vec::new(),
        };

        let a = fingerprints_for(&candidate);
        let b = fingerprints_for(&candidate);
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.content_hash, "92c529e5ca52754f58f1ccd6d17db466");
        assert_eq!(a.normalized_title, "droner over aalborg lufthavn");
        assert_eq!(a.location_hash.len(), 16);
    }
}
