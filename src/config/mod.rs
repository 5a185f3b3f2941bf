//! Service configuration — environment variables, CLI overrides, defaults

use tracing::warn;

/// DroneWatch service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection URL (PostGIS required)
    pub database_url: String,
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,
    /// Bearer token gating the ingest endpoint
    pub ingest_token: String,
    /// Chat-completions endpoint base for the LLM classifier
    pub llm_api_url: String,
    /// API key for the classifier; when unset the validator runs without
    /// the classifier layer (degraded mode)
    pub llm_api_key: Option<String>,
    /// Classifier model name
    pub llm_model: String,
    /// Exact CORS origins; never a wildcard
    pub allowed_origins: Vec<String>,
    /// Deployment environment name ("development", "production")
    pub env: String,
    /// Cache-Control max-age for query responses (seconds)
    pub cache_ttl_seconds: u64,
    /// Database pool size
    pub db_max_connections: u32,
    /// Per-source collector concurrency cap (1–4)
    pub collector_concurrency: usize,
    /// Seconds between orchestrator cycles
    pub cycle_interval_secs: u64,
    /// Hard wall clock for one orchestrator cycle (seconds)
    pub cycle_deadline_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            bind_address: "0.0.0.0:8080".to_string(),
            ingest_token: String::new(),
            llm_api_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            allowed_origins: Vec::new(),
            env: "development".to_string(),
            cache_ttl_seconds: 15,
            db_max_connections: 20,
            collector_concurrency: 2,
            cycle_interval_secs: 300,
            cycle_deadline_secs: 120,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with CLI overrides.
    ///
    /// Returns an error in release builds when `INGEST_TOKEN` is not set,
    /// preventing the service from starting with an open write endpoint.
    /// In debug builds a warning is emitted and a dev token is used.
    pub fn from_env(
        database_url: Option<String>,
        bind_address: Option<String>,
        port: Option<u16>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();

        // Database URL: CLI arg > env var
        config.database_url = database_url
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_default();

        // Bind address: CLI --bind-address or --port
        if let Some(addr) = bind_address {
            config.bind_address = addr;
        } else if let Some(p) = port {
            config.bind_address = format!("0.0.0.0:{}", p);
        }

        // Ingest token — mandatory in release builds
        config.ingest_token = match std::env::var("INGEST_TOKEN") {
            Ok(token) => token,
            Err(_) => {
                if cfg!(debug_assertions) {
                    warn!("INGEST_TOKEN not set, using default dev token — do NOT use in production");
                    "dev-ingest-token".to_string()
                } else {
                    anyhow::bail!(
                        "INGEST_TOKEN environment variable is not set. \
                         The service cannot start in release mode with an open ingest endpoint. \
                         Set INGEST_TOKEN to a shared secret."
                    );
                }
            }
        };

        // LLM classifier settings
        config.llm_api_key = std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(v) = std::env::var("LLM_API_URL") {
            if !v.is_empty() {
                config.llm_api_url = v;
            }
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            if !v.is_empty() {
                config.llm_model = v;
            }
        }

        // CORS whitelist: comma-separated exact origins
        if let Ok(v) = std::env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(v) = std::env::var("ENV") {
            if !v.is_empty() {
                config.env = v;
            }
        }

        // Optional overrides from env
        if let Ok(v) = std::env::var("CACHE_TTL_SECONDS") {
            if let Ok(n) = v.parse() {
                config.cache_ttl_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("DB_MAX_CONNECTIONS") {
            if let Ok(n) = v.parse() {
                config.db_max_connections = n;
            }
        }
        if let Ok(v) = std::env::var("COLLECTOR_CONCURRENCY") {
            if let Ok(n) = v.parse::<usize>() {
                config.collector_concurrency = n.clamp(1, 4);
            }
        }
        if let Ok(v) = std::env::var("CYCLE_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                config.cycle_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("CYCLE_DEADLINE_SECS") {
            if let Ok(n) = v.parse() {
                config.cycle_deadline_secs = n;
            }
        }

        Ok(config)
    }
}
