//! Bearer-token authentication extractor for the ingest endpoint.

use super::error::ApiError;
use super::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

/// Proof that the request carried the operator ingest token.
pub struct IngestAuth;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for IngestAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("Missing Bearer token"))?;

        if token == state.config.ingest_token {
            Ok(IngestAuth)
        } else {
            Err(ApiError::unauthorized("Invalid ingest token"))
        }
    }
}
