//! LLM classifier layer: interface, HTTP implementation, and test fake.
//!
//! The classifier is one bounded call per report against an external
//! chat-completions API. It is a policy layer, not a trusted oracle: the
//! validator only admits on an affirmative verdict and treats every
//! transport or parse failure as "classifier unavailable", which downgrades
//! to keyword-layer acceptance rather than failing the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Verdict category produced by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Incident,
    Policy,
    Defense,
    Discussion,
    Other,
}

/// Structured verdict returned by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub category: Category,
    pub is_incident: bool,
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: String,
}

impl Verdict {
    /// Admission policy: category must be `incident` and confidence ≥ 0.7.
    pub fn admits(&self) -> bool {
        self.category == Category::Incident && self.confidence >= 0.7
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier transport error: {0}")]
    Transport(String),

    #[error("classifier timed out")]
    Timeout,

    #[error("malformed classifier response: {0}")]
    Malformed(String),

    #[error("classifier not configured")]
    Disabled,
}

/// A single-call incident classifier.
#[async_trait]
pub trait IncidentClassifier: Send + Sync {
    async fn classify(&self, title: &str, body: &str) -> Result<Verdict, ClassifierError>;
}

const SYSTEM_PROMPT: &str = "You classify European news reports about drones. \
Respond with a single JSON object: {\"category\": \"incident\"|\"policy\"|\"defense\"|\"discussion\"|\"other\", \
\"is_incident\": bool, \"confidence\": 0.0-1.0, \"reasoning\": \"...\"}. \
An incident is a concrete drone observation or disruption at a specific place and time. \
Policy announcements, military procurement, exercises, and product coverage are not incidents.";

/// Wall-clock budget for one classification call.
const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP classifier against an OpenAI-compatible chat-completions endpoint.
pub struct HttpClassifier {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl HttpClassifier {
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(CLASSIFY_TIMEOUT)
            .build()
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn parse_verdict(content: &str) -> Result<Verdict, ClassifierError> {
        // Models occasionally wrap the object in a code fence; take the
        // outermost braces.
        let start = content.find('{');
        let end = content.rfind('}');
        let json = match (start, end) {
            (Some(s), Some(e)) if e > s => &content[s..=e],
            _ => return Err(ClassifierError::Malformed("no JSON object in reply".into())),
        };

        let verdict: Verdict =
            serde_json::from_str(json).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        if !(0.0..=1.0).contains(&verdict.confidence) {
            return Err(ClassifierError::Malformed(format!(
                "confidence out of range: {}",
                verdict.confidence
            )));
        }
        Ok(verdict)
    }
}

#[async_trait]
impl IncidentClassifier for HttpClassifier {
    async fn classify(&self, title: &str, body: &str) -> Result<Verdict, ClassifierError> {
        let user = format!("TITLE: {title}\n\nBODY: {body}");
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.0,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout
                } else {
                    ClassifierError::Transport(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(ClassifierError::Transport(format!(
                "status {}",
                resp.status()
            )));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ClassifierError::Malformed("empty choices".into()))?;

        let verdict = Self::parse_verdict(content)?;
        debug!(
            category = ?verdict.category,
            confidence = verdict.confidence,
            "classifier verdict"
        );
        Ok(verdict)
    }
}

/// Classifier that always reports unavailability. Used when `LLM_API_KEY`
/// is not configured; the validator then runs in degraded mode.
pub struct DisabledClassifier;

#[async_trait]
impl IncidentClassifier for DisabledClassifier {
    async fn classify(&self, _title: &str, _body: &str) -> Result<Verdict, ClassifierError> {
        Err(ClassifierError::Disabled)
    }
}

/// In-memory fake returning a fixed response, for tests.
pub struct StaticClassifier {
    verdict: Result<Verdict, ()>,
}

impl StaticClassifier {
    pub fn admitting(confidence: f32) -> Self {
        Self {
            verdict: Ok(Verdict {
                category: Category::Incident,
                is_incident: true,
                confidence,
                reasoning: "fixture".to_string(),
            }),
        }
    }

    pub fn rejecting(category: Category, confidence: f32) -> Self {
        Self {
            verdict: Ok(Verdict {
                category,
                is_incident: false,
                confidence,
                reasoning: "fixture".to_string(),
            }),
        }
    }

    pub fn unavailable() -> Self {
        Self { verdict: Err(()) }
    }
}

#[async_trait]
impl IncidentClassifier for StaticClassifier {
    async fn classify(&self, _title: &str, _body: &str) -> Result<Verdict, ClassifierError> {
        match &self.verdict {
            Ok(v) => Ok(v.clone()),
            Err(()) => Err(ClassifierError::Transport("fixture offline".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_policy_gate() {
        let admit = Verdict {
            category: Category::Incident,
            is_incident: true,
            confidence: 0.7,
            reasoning: String::new(),
        };
        assert!(admit.admits());

        let low = Verdict {
            confidence: 0.69,
            ..admit.clone()
        };
        assert!(!low.admits());

        let policy = Verdict {
            category: Category::Policy,
            confidence: 0.99,
            ..admit
        };
        assert!(!policy.admits());
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain = r#"{"category":"incident","is_incident":true,"confidence":0.91,"reasoning":"sighting"}"#;
        let v = HttpClassifier::parse_verdict(plain).unwrap();
        assert_eq!(v.category, Category::Incident);

        let fenced = "```json\n{\"category\":\"policy\",\"is_incident\":false,\"confidence\":0.9,\"reasoning\":\"ban announcement\"}\n```";
        let v = HttpClassifier::parse_verdict(fenced).unwrap();
        assert_eq!(v.category, Category::Policy);
    }

    #[test]
    fn malformed_replies_are_errors_not_verdicts() {
        assert!(matches!(
            HttpClassifier::parse_verdict("I think this is an incident."),
            Err(ClassifierError::Malformed(_))
        ));
        assert!(matches!(
            HttpClassifier::parse_verdict(r#"{"category":"incident","is_incident":true,"confidence":1.7}"#),
            Err(ClassifierError::Malformed(_))
        ));
    }
}
