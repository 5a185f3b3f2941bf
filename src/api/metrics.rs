//! Pipeline counters endpoint.

use super::AppState;
use crate::metrics::MetricsSnapshot;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// GET /api/metrics — point-in-time pipeline counters.
pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
