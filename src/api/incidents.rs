//! Read endpoints: filtered list and single-incident detail.

use super::error::ApiError;
use super::AppState;
use crate::store::incidents::{self, BoundingBox, IncidentFilter, IncidentView};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Hard cap on page size regardless of the requested limit.
const MAX_LIMIT: i64 = 1_000;
const DEFAULT_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub min_evidence: Option<i16>,
    pub country: Option<String>,
    pub status: Option<String>,
    pub bbox: Option<String>,
    pub asset_type: Option<String>,
    pub date_range: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parse `minLon,minLat,maxLon,maxLat`. Anything but four finite floats in
/// order is a 400.
fn parse_bbox(raw: &str) -> Result<BoundingBox, ApiError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(ApiError::bad_request(
            "bbox must be minLon,minLat,maxLon,maxLat",
        ));
    }
    let mut values = [0.0f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ApiError::bad_request(format!("bbox value {part} is not a number")))?;
    }
    let bbox = BoundingBox {
        min_lon: values[0],
        min_lat: values[1],
        max_lon: values[2],
        max_lat: values[3],
    };
    if bbox.min_lon > bbox.max_lon || bbox.min_lat > bbox.max_lat {
        return Err(ApiError::bad_request("bbox minimum exceeds maximum"));
    }
    Ok(bbox)
}

fn build_filter(params: ListParams) -> Result<IncidentFilter, ApiError> {
    let mut filter = IncidentFilter::default();

    if let Some(min_evidence) = params.min_evidence {
        if !(1..=4).contains(&min_evidence) {
            return Err(ApiError::bad_request("min_evidence must be 1..4"));
        }
        filter.min_evidence = min_evidence;
    }

    if let Some(country) = params.country {
        let code = country.trim().to_uppercase();
        if code != "ALL" {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ApiError::bad_request("country must be ISO alpha-2 or 'all'"));
            }
            filter.country = Some(code);
        }
    }

    if let Some(status) = params.status {
        filter.status = Some(
            status
                .parse()
                .map_err(|e: String| ApiError::bad_request(e))?,
        );
    }

    if let Some(asset_type) = params.asset_type {
        filter.asset_type = Some(
            asset_type
                .parse()
                .map_err(|e: String| ApiError::bad_request(e))?,
        );
    }

    if let Some(raw) = params.bbox {
        filter.bbox = Some(parse_bbox(&raw)?);
    }

    if let Some(range) = params.date_range {
        filter.occurred_after = match range.as_str() {
            "day" => Some(Utc::now() - Duration::days(1)),
            "week" => Some(Utc::now() - Duration::days(7)),
            "month" => Some(Utc::now() - Duration::days(30)),
            "all" => None,
            other => {
                return Err(ApiError::bad_request(format!(
                    "unknown date_range: {other}"
                )))
            }
        };
    }

    filter.search = params.search.filter(|s| !s.trim().is_empty());
    filter.limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    filter.offset = params.offset.unwrap_or(0).max(0);

    Ok(filter)
}

fn cached_json<T: serde::Serialize>(state: &AppState, body: T) -> Response {
    (
        [(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.config.cache_ttl_seconds),
        )],
        Json(body),
    )
        .into_response()
}

/// GET /api/incidents
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let filter = build_filter(params)?;
    let items: Vec<IncidentView> = incidents::list_incidents(&state.db, &filter)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(cached_json(&state, items))
}

/// GET /api/incidents/:id
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let incident = incidents::get_incident(&state.db, id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("incident {id} not found")))?;
    Ok(cached_json(&state, incident))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_happy_path_and_boundary() {
        let bbox = parse_bbox("-10,35,31,71").unwrap();
        assert_eq!(bbox.min_lon, -10.0);
        assert_eq!(bbox.max_lat, 71.0);
    }

    #[test]
    fn bbox_malformed_inputs_are_400() {
        for raw in ["", "1,2,3", "1,2,3,4,5", "a,b,c,d", "1,,3,4", "NaN,2,3,4", "5,5,1,1"] {
            assert!(parse_bbox(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn filter_defaults() {
        let filter = build_filter(ListParams::default()).unwrap();
        assert_eq!(filter.min_evidence, 1);
        assert_eq!(filter.limit, 500);
        assert_eq!(filter.offset, 0);
        assert!(filter.country.is_none());
    }

    #[test]
    fn country_all_clears_the_filter() {
        let filter = build_filter(ListParams {
            country: Some("all".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(filter.country.is_none());

        let filter = build_filter(ListParams {
            country: Some("dk".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.country.as_deref(), Some("DK"));
    }

    #[test]
    fn limit_is_capped() {
        let filter = build_filter(ListParams {
            limit: Some(50_000),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.limit, 1_000);
    }

    #[test]
    fn min_evidence_out_of_range_is_400() {
        for bad in [0, 5, -1] {
            assert!(build_filter(ListParams {
                min_evidence: Some(bad),
                ..Default::default()
            })
            .is_err());
        }
    }

    #[test]
    fn date_range_maps_to_cutoffs() {
        let filter = build_filter(ListParams {
            date_range: Some("week".to_string()),
            ..Default::default()
        })
        .unwrap();
        let cutoff = filter.occurred_after.unwrap();
        let expect = Utc::now() - Duration::days(7);
        assert!((cutoff - expect).num_seconds().abs() < 5);

        assert!(build_filter(ListParams {
            date_range: Some("fortnight".to_string()),
            ..Default::default()
        })
        .is_err());
    }
}
