//! DroneWatch server binary: ingest + query API with the background
//! collector orchestrator.
//!
//! ## Environment variables
//!
//! | Variable              | Required | Description                              |
//! |-----------------------|----------|------------------------------------------|
//! | `DATABASE_URL`        | Yes      | PostgreSQL connection string (PostGIS)   |
//! | `INGEST_TOKEN`        | Yes      | Bearer token for the ingest endpoint     |
//! | `LLM_API_KEY`         | No       | Classifier API key; unset = degraded mode|
//! | `LLM_MODEL`           | No       | Classifier model (default small model)   |
//! | `ALLOWED_ORIGINS`     | No       | Comma-separated exact CORS origins       |
//! | `ENV`                 | No       | Deployment environment name              |
//! | `CACHE_TTL_SECONDS`   | No       | Query response cache TTL (default 15)    |

use clap::Parser;
use dronewatch::api::{build_router, AppState};
use dronewatch::config::AppConfig;
use dronewatch::metrics::PipelineMetrics;
use dronewatch::orchestrator;
use dronewatch::pipeline::IngestPipeline;
use dronewatch::registry::SourceRegistry;
use dronewatch::store::{db, sources};
use dronewatch::validate::classifier::{DisabledClassifier, HttpClassifier, IncidentClassifier};
use dronewatch::validate::Validator;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "dronewatch", about = "DroneWatch — drone incident aggregation service")]
struct CliArgs {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Port to listen on (default: 8080)
    #[arg(long, short)]
    port: Option<u16>,

    /// Bind address (overrides --port)
    #[arg(long)]
    bind_address: Option<String>,

    /// Run one collector cycle and exit instead of serving
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,dronewatch=debug")),
        )
        .init();

    let args = CliArgs::parse();

    let config = Arc::new(AppConfig::from_env(
        args.database_url,
        args.bind_address,
        args.port,
    )?);

    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL must be set via --database-url or DATABASE_URL env var");
    }

    info!(bind = %config.bind_address, env = %config.env, "Starting DroneWatch");

    // ── Database ──────────────────────────────────────────────────────────────
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    // ── Registry ──────────────────────────────────────────────────────────────
    let registry = SourceRegistry::builtin()?;
    sources::sync_registry(&pool, &registry).await?;

    // ── Classifier ────────────────────────────────────────────────────────────
    let classifier: Arc<dyn IncidentClassifier> = match &config.llm_api_key {
        Some(key) => {
            info!(model = %config.llm_model, "LLM classifier enabled");
            Arc::new(HttpClassifier::new(&config.llm_api_url, key, &config.llm_model)?)
        }
        None => {
            warn!("LLM_API_KEY not set — validator runs in degraded mode (keyword layers only)");
            Arc::new(DisabledClassifier)
        }
    };

    // ── Shared state ──────────────────────────────────────────────────────────
    let metrics = Arc::new(PipelineMetrics::default());
    let pipeline = Arc::new(IngestPipeline::new(
        pool.clone(),
        Arc::clone(&registry),
        Validator::new(classifier),
        Arc::clone(&metrics),
    ));

    if args.once {
        let report =
            orchestrator::run_cycle(&pool, &registry, &pipeline, &metrics).await;
        info!(
            sources = report.sources_run,
            found = report.reports_found,
            ingested = report.ingested,
            skipped = report.skipped,
            errors = report.errors,
            "Single cycle complete"
        );
        return Ok(());
    }

    // ── Background orchestrator ───────────────────────────────────────────────
    tokio::spawn(orchestrator::run_orchestrator(
        pool.clone(),
        Arc::clone(&registry),
        Arc::clone(&config),
        Arc::clone(&pipeline),
        Arc::clone(&metrics),
    ));
    info!(
        interval_secs = config.cycle_interval_secs,
        "Orchestrator started"
    );

    // ── HTTP Server ───────────────────────────────────────────────────────────
    let state = AppState::new(pool, Arc::clone(&config), registry, metrics, pipeline);
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "DroneWatch listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("DroneWatch shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not install Ctrl+C handler");
        return;
    }
    info!("Shutdown signal received");
}
