//! HTTP API: route registration and shared state.

pub mod auth;
pub mod embed;
pub mod error;
pub mod health;
pub mod incidents;
pub mod ingest;
pub mod metrics;

use crate::config::AppConfig;
use crate::metrics::PipelineMetrics;
use crate::pipeline::IngestPipeline;
use crate::registry::SourceRegistry;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared application state
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Service configuration
    pub config: Arc<AppConfig>,
    /// Static source catalog and gazetteer
    pub registry: Arc<SourceRegistry>,
    /// Pipeline counters
    pub metrics: Arc<PipelineMetrics>,
    /// Shared ingest pipeline
    pub pipeline: Arc<IngestPipeline>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Arc<AppConfig>,
        registry: Arc<SourceRegistry>,
        metrics: Arc<PipelineMetrics>,
        pipeline: Arc<IngestPipeline>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            config,
            registry,
            metrics,
            pipeline,
        })
    }
}

/// CORS layer over the configured exact-origin whitelist. Origins that do
/// not parse as header values are dropped with a warning; an empty
/// whitelist means no cross-origin access, never a wildcard.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Build the complete API router
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Write side
        .route("/ingest", post(ingest::ingest))
        // Read side
        .route("/incidents", get(incidents::list))
        .route("/incidents/:id", get(incidents::detail))
        .route("/embed/snippet", get(embed::snippet))
        .route("/metrics", get(metrics::snapshot))
        .route("/healthz", get(health::healthz));

    Router::new()
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}
