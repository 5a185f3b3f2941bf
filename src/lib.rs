//! DroneWatch: drone incident aggregation for critical European
//! infrastructure.
//!
//! ## Architecture
//!
//! - **Collectors**: per-source feed adapters producing uniform raw reports
//! - **Validator**: layered funnel (keywords → foreign-region → LLM
//!   classifier → geographic bounds)
//! - **Geocoder**: gazetteer resolution of report text to coordinates
//! - **Deduper**: content-hash plus spatial-temporal consolidation
//! - **Store**: transactional PostGIS layer with validation and evidence
//!   triggers
//! - **APIs**: token-authenticated ingest, filtered read endpoints
//! - **Orchestrator**: periodic collector cycles with cache short-circuit

pub mod api;
pub mod collect;
pub mod config;
pub mod dedupe;
pub mod fingerprint;
pub mod geo;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod types;
pub mod validate;

// Re-export the core domain types
pub use types::{
    AssetType, IncidentCandidate, IncidentSourceView, IncidentStatus, RawReport, SourceRef,
    SourceType,
};

// Re-export the pipeline surface
pub use pipeline::{IngestAction, IngestError, IngestInput, IngestOutcome, IngestPipeline};

// Re-export store views used by API consumers
pub use store::incidents::{BoundingBox, IncidentFilter, IncidentView};
pub use store::StoreError;

// Re-export validation outcomes
pub use validate::{Admission, RejectReason, Validator};
