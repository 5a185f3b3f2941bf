//! Multi-layer validation funnel.
//!
//! A report must pass every layer to be admitted:
//!
//! 1. keyword layer — drone token present, no excluded-topic marker;
//! 2. geographic keyword layer — no foreign-region token (the text wins
//!    over in-region coordinates);
//! 3. LLM classifier — `incident` with confidence ≥ 0.7, degrading to
//!    layer-1/2 acceptance when the classifier is unreachable;
//! 4. geographic bounds — applied after geocoding, and re-checked by the
//!    database trigger as the final gate.
//!
//! The first failing layer's reason is returned; the orchestrator keys
//! metrics off it.

pub mod classifier;
pub mod keywords;
pub mod url;

use crate::geo;
use classifier::{ClassifierError, IncidentClassifier};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Why a report was rejected, tagged with the first failing layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Keyword or classifier layer: not a drone incident.
    NotAnIncident { detail: String },
    /// Foreign-region token found in title or narrative.
    ForeignKeyword { token: String },
    /// Coordinates outside the European bounding box.
    OutOfBounds { lat: f64, lon: f64 },
}

impl RejectReason {
    /// Machine-readable code carried in metrics, audit rows, and API errors.
    pub fn code(&self) -> String {
        match self {
            RejectReason::NotAnIncident { .. } => "not_an_incident".to_string(),
            RejectReason::ForeignKeyword { token } => format!("foreign_keyword:{token}"),
            RejectReason::OutOfBounds { .. } => "out_of_bounds".to_string(),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotAnIncident { detail } => write!(f, "not an incident: {detail}"),
            RejectReason::ForeignKeyword { token } => write!(f, "foreign keyword: {token}"),
            RejectReason::OutOfBounds { lat, lon } => {
                write!(f, "coordinates outside European bounds: ({lat}, {lon})")
            }
        }
    }
}

/// A successful admission through layers 1–3.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub confidence: f32,
    /// True when the classifier was unavailable and the report was admitted
    /// on the keyword layers alone.
    pub degraded: bool,
}

/// The layered validator. Cheap layers run first; the classifier is only
/// consulted for reports that already look like in-region drone incidents.
pub struct Validator {
    classifier: Arc<dyn IncidentClassifier>,
}

impl Validator {
    pub fn new(classifier: Arc<dyn IncidentClassifier>) -> Self {
        Self { classifier }
    }

    /// Layers 1–2, synchronous and pure.
    pub fn check_text(
        title: &str,
        body: &str,
        extra_keywords: &[String],
    ) -> Result<f32, RejectReason> {
        let keyword = keywords::drone_keyword_match(title, body, extra_keywords).ok_or_else(|| {
            RejectReason::NotAnIncident {
                detail: "no drone keyword".to_string(),
            }
        })?;

        if let Some(marker) = keywords::excluded_topic_hit(title, body) {
            return Err(RejectReason::NotAnIncident {
                detail: format!("excluded topic: {marker}"),
            });
        }

        let combined = format!("{title} {body}");
        if let Some(token) = keywords::foreign_region_hit(&combined) {
            return Err(RejectReason::ForeignKeyword { token });
        }

        Ok(keyword.confidence)
    }

    /// Layers 1–3. On classifier unavailability, falls back to the keyword
    /// confidence with `degraded = true`; a rejecting verdict is never
    /// overridden.
    pub async fn validate_text(
        &self,
        title: &str,
        body: &str,
        extra_keywords: &[String],
    ) -> Result<Admission, RejectReason> {
        let keyword_confidence = Self::check_text(title, body, extra_keywords)?;

        match self.classifier.classify(title, body).await {
            Ok(verdict) => {
                if verdict.admits() {
                    Ok(Admission {
                        confidence: verdict.confidence,
                        degraded: false,
                    })
                } else {
                    Err(RejectReason::NotAnIncident {
                        detail: format!(
                            "classifier: {:?} (confidence {:.2})",
                            verdict.category, verdict.confidence
                        ),
                    })
                }
            }
            Err(ClassifierError::Disabled) => Ok(Admission {
                confidence: keyword_confidence,
                degraded: true,
            }),
            Err(e) => {
                warn!(error = %e, "classifier unavailable, admitting on keyword layers");
                Ok(Admission {
                    confidence: keyword_confidence,
                    degraded: true,
                })
            }
        }
    }

    /// Layer 4: the European bounding box, boundary inclusive.
    pub fn check_bounds(lat: f64, lon: f64) -> Result<(), RejectReason> {
        if geo::within_european_bounds(lat, lon) {
            Ok(())
        } else {
            Err(RejectReason::OutOfBounds { lat, lon })
        }
    }
}
