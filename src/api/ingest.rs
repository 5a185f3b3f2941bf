//! Token-authenticated write endpoint wrapping the ingest pipeline.

use super::auth::IngestAuth;
use super::error::ApiError;
use super::AppState;
use crate::pipeline::{IngestAction, IngestInput};
use crate::types::{AssetType, IncidentStatus, SourceRef};
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub title: String,
    #[serde(default)]
    pub narrative: String,
    pub occurred_at: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub asset_type: AssetType,
    pub status: Option<IncidentStatus>,
    pub country: Option<String>,
    pub sources: Vec<SourceRef>,
    /// Optional location text, used only when lat/lon are absent.
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: Uuid,
    pub action: IngestAction,
}

/// POST /api/ingest
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    _auth: IngestAuth,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }

    let country = match &request.country {
        Some(c) => {
            let code = c.trim().to_uppercase();
            if code.len() != 2 || !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
                return Err(ApiError::bad_request("country must be ISO-3166-1 alpha-2"));
            }
            Some(code)
        }
        None => None,
    };

    let input = IngestInput {
        title: request.title,
        narrative: request.narrative,
        occurred_at: request.occurred_at,
        lat: request.lat,
        lon: request.lon,
        asset_type: Some(request.asset_type),
        status: request.status.unwrap_or(IncidentStatus::Active),
        country,
        sources: request.sources,
        location_hint: request.location,
        source_country: None,
        extra_keywords: Vec::new(),
    };

    let outcome = state.pipeline.ingest(input).await?;
    Ok(Json(IngestResponse {
        id: outcome.id,
        action: outcome.action,
    }))
}
