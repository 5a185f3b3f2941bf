//! Embed snippet endpoint: a small HTML stub a site can iframe.

use super::AppState;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct EmbedParams {
    pub min_evidence: Option<i16>,
    pub country: Option<String>,
    pub height: Option<u32>,
}

/// GET /api/embed/snippet
pub async fn snippet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EmbedParams>,
) -> Response {
    let min_evidence = params.min_evidence.unwrap_or(1).clamp(1, 4);
    let country = params
        .country
        .filter(|c| c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .map_or_else(|| "all".to_string(), |c| c.to_uppercase());
    let height = params.height.unwrap_or(600).clamp(200, 2_000);

    let html = format!(
        r#"<div class="dronewatch-embed" data-min-evidence="{min_evidence}" data-country="{country}" style="height:{height}px">
  <iframe src="/embed?min_evidence={min_evidence}&country={country}" width="100%" height="{height}" frameborder="0" loading="lazy" title="DroneWatch incidents"></iframe>
</div>
"#
    );

    (
        [(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.config.cache_ttl_seconds),
        )],
        Html(html),
    )
        .into_response()
}
