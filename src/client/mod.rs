//! Explanation client.
//!
//! Turns code units into requests against the explanation endpoint and
//! normalizes every kind of failure into a per-unit `Error: ...` string:
//! - transport failures (no response at all)
//! - non-2xx statuses, with a best-effort server message
//! - bodies that are not the expected JSON
//! - service-level `error` fields
//!
//! Requests are issued one at a time by the owner (`&mut self`), so there
//! is at most one request in flight per client.

mod cache;
mod response;
mod transport;

pub use cache::{ExplanationCache, DEFAULT_CAPACITY};
pub use response::{
    decode, excerpt, server_error_message, BatchPayload, BatchRequest, ExplanationEntry,
    SinglePayload, SingleRequest, EXCERPT_LEN,
};
pub use transport::{HttpReply, HttpTransport, Transport, TransportError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::{CodeUnit, UnitPosition};
use crate::language::TargetLanguage;

/// Text used when the service answered but said nothing about a unit.
pub const NO_EXPLANATION: &str = "No explanation available";

/// Why an explanation could not be obtained.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0} (check your connection)")]
    Network(#[from] TransportError),
    #[error("Server error: {message}")]
    Server { status: u16, message: String },
    #[error("Invalid response: {excerpt}")]
    InvalidResponse { excerpt: String },
    #[error("{0}")]
    Service(String),
}

impl ClientError {
    /// The string shown in place of an explanation.
    pub fn display_text(&self) -> String {
        format!("Error: {}", self)
    }
}

/// What came back for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Explanation(String),
    Error(String),
}

impl Outcome {
    /// Text to render, success or not.
    pub fn text(&self) -> &str {
        match self {
            Outcome::Explanation(text) | Outcome::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

/// An outcome tied to the unit it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationResult {
    pub position: UnitPosition,
    pub outcome: Outcome,
}

/// Client for the explanation endpoint with a response cache.
pub struct ExplanationClient<T: Transport> {
    transport: T,
    endpoint: String,
    cache: ExplanationCache,
}

impl<T: Transport> ExplanationClient<T> {
    pub fn new(transport: T, endpoint: impl Into<String>, cache: ExplanationCache) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            cache,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &ExplanationCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ExplanationCache {
        &mut self.cache
    }

    /// Explain all units with a single batched request.
    ///
    /// Always returns one result per unit, in input order. A failed request
    /// gives every unit the same error text.
    pub async fn interpret_units(
        &mut self,
        units: &[CodeUnit],
        language: TargetLanguage,
    ) -> Vec<ExplanationResult> {
        if units.is_empty() {
            return Vec::new();
        }

        match self.fetch_batch(units, language).await {
            Ok(entries) => {
                let mut explanations: Vec<Option<String>> = vec![None; units.len()];
                for entry in entries {
                    // lineNumber is 1-based into the request array
                    let Some(index) = entry.line_number.checked_sub(1) else {
                        continue;
                    };
                    if let (Some(slot), Some(text)) = (explanations.get_mut(index), entry.explanation) {
                        if !text.trim().is_empty() {
                            *slot = Some(text.trim().to_string());
                        }
                    }
                }

                units
                    .iter()
                    .zip(explanations)
                    .map(|(unit, text)| ExplanationResult {
                        position: unit.position,
                        outcome: Outcome::Explanation(
                            text.unwrap_or_else(|| NO_EXPLANATION.to_string()),
                        ),
                    })
                    .collect()
            }
            Err(err) => {
                warn!(units = units.len(), error = %err, "batch explanation failed");
                let text = err.display_text();
                units
                    .iter()
                    .map(|unit| ExplanationResult {
                        position: unit.position,
                        outcome: Outcome::Error(text.clone()),
                    })
                    .collect()
            }
        }
    }

    /// Explain one piece of code (a line or a whole block).
    pub async fn interpret_one(
        &mut self,
        code: &str,
        language: TargetLanguage,
    ) -> Result<String, ClientError> {
        let key = ExplanationCache::single_key(code, language);

        if let Some(raw) = self.cache.get(&key) {
            debug!(key_len = key.len(), "single explanation served from cache");
            return explanation_text(decode::<SinglePayload>(&raw)?);
        }

        let request = SingleRequest {
            code_line: code,
            language: language.as_str(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| ClientError::InvalidResponse { excerpt: e.to_string() })?;

        let raw = self.post(&body).await?;
        let payload = decode::<SinglePayload>(&raw)?;
        self.cache.put(key, raw, []);
        explanation_text(payload)
    }

    /// Resolve a batch to its explanation entries, via the cache when possible.
    async fn fetch_batch(
        &mut self,
        units: &[CodeUnit],
        language: TargetLanguage,
    ) -> Result<Vec<ExplanationEntry>, ClientError> {
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        let key = ExplanationCache::batch_key(&texts, language);
        let lines = units.iter().flat_map(|u| u.position.lines());

        if let Some(raw) = self.cache.get(&key) {
            debug!(units = units.len(), "batch served from cache");
            self.cache.note_lines(&key, lines);
            return batch_entries(decode::<BatchPayload>(&raw)?);
        }

        debug!(units = units.len(), language = %language, "requesting batch explanation");
        let request = BatchRequest {
            code_lines: texts,
            language: language.as_str(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| ClientError::InvalidResponse { excerpt: e.to_string() })?;

        let raw = self.post(&body).await?;
        let payload = decode::<BatchPayload>(&raw)?;
        self.cache.put(key, raw, lines);
        batch_entries(payload)
    }

    /// POST a body and return the raw text of a 2xx response.
    async fn post(&self, body: &serde_json::Value) -> Result<String, ClientError> {
        let reply = self.transport.post_json(&self.endpoint, body).await?;

        if !reply.is_success() {
            return Err(ClientError::Server {
                status: reply.status,
                message: server_error_message(&reply.status_text, &reply.body),
            });
        }

        Ok(reply.body)
    }
}

fn batch_entries(payload: BatchPayload) -> Result<Vec<ExplanationEntry>, ClientError> {
    match payload {
        BatchPayload::Explanations { explanations } => Ok(explanations),
        BatchPayload::Failure { error } => Err(ClientError::Service(error)),
    }
}

fn explanation_text(payload: SinglePayload) -> Result<String, ClientError> {
    match payload {
        SinglePayload::Explanation { explanation } if !explanation.trim().is_empty() => {
            Ok(explanation.trim().to_string())
        }
        SinglePayload::Explanation { .. } => Ok(NO_EXPLANATION.to_string()),
        SinglePayload::Failure { error } => Err(ClientError::Service(error)),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;

    fn client(transport: MockTransport) -> ExplanationClient<MockTransport> {
        ExplanationClient::new(transport, "http://test/api", ExplanationCache::new(16))
    }

    fn units() -> Vec<CodeUnit> {
        vec![CodeUnit::line(0, "const x = 10;"), CodeUnit::line(2, "x++;")]
    }

    #[tokio::test]
    async fn test_batch_maps_line_numbers_to_units() {
        let transport = MockTransport::new().reply(HttpReply::ok(
            r#"{"explanations":[{"lineNumber":2,"explanation":"Increments x"},{"lineNumber":1,"explanation":"Declares x"}]}"#,
        ));
        let mut client = client(transport);

        let results = client.interpret_units(&units(), TargetLanguage::English).await;
        assert_eq!(
            results,
            vec![
                ExplanationResult {
                    position: UnitPosition::Line(0),
                    outcome: Outcome::Explanation("Declares x".to_string()),
                },
                ExplanationResult {
                    position: UnitPosition::Line(2),
                    outcome: Outcome::Explanation("Increments x".to_string()),
                },
            ]
        );

        let requests = client.transport().requests.lock().unwrap();
        assert_eq!(
            requests[0],
            serde_json::json!({"codeLines": ["const x = 10;", "x++;"], "language": "English"})
        );
    }

    #[tokio::test]
    async fn test_missing_entry_gets_placeholder() {
        let transport = MockTransport::new().reply(HttpReply::ok(
            r#"{"explanations":[{"lineNumber":1,"explanation":"Declares x"},{"lineNumber":9,"explanation":"stray"}]}"#,
        ));
        let mut client = client(transport);

        let results = client.interpret_units(&units(), TargetLanguage::English).await;
        assert_eq!(results[1].outcome, Outcome::Explanation(NO_EXPLANATION.to_string()));
    }

    #[tokio::test]
    async fn test_second_identical_batch_is_served_from_cache() {
        let transport = MockTransport::new().reply(HttpReply::ok(
            r#"{"explanations":[{"lineNumber":1,"explanation":"a"},{"lineNumber":2,"explanation":"b"}]}"#,
        ));
        let mut client = client(transport);

        let first = client.interpret_units(&units(), TargetLanguage::English).await;
        let second = client.interpret_units(&units(), TargetLanguage::English).await;

        assert_eq!(first, second);
        assert_eq!(client.transport().request_count(), 1);
        assert_eq!(client.cache().stats(), (1, 1));
    }

    #[tokio::test]
    async fn test_language_is_part_of_the_key() {
        let body = r#"{"explanations":[{"lineNumber":1,"explanation":"a"}]}"#;
        let transport = MockTransport::new()
            .reply(HttpReply::ok(body))
            .reply(HttpReply::ok(body));
        let mut client = client(transport);
        let one = [CodeUnit::line(0, "a();")];

        client.interpret_units(&one, TargetLanguage::English).await;
        client.interpret_units(&one, TargetLanguage::French).await;
        assert_eq!(client.transport().request_count(), 2);
    }

    #[tokio::test]
    async fn test_server_error_applies_to_every_unit() {
        let transport = MockTransport::new().reply(HttpReply {
            status: 500,
            status_text: "Internal Server Error".to_string(),
            body: r#"{"error":"rate limited"}"#.to_string(),
        });
        let mut client = client(transport);

        let results = client.interpret_units(&units(), TargetLanguage::English).await;
        assert_eq!(results.len(), 2);
        for result in results {
            assert_eq!(
                result.outcome,
                Outcome::Error("Error: Server error: rate limited".to_string())
            );
        }
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_mentions_connection() {
        let transport =
            MockTransport::new().fail(TransportError::Network("connection refused".to_string()));
        let mut client = client(transport);

        let results = client.interpret_units(&units(), TargetLanguage::English).await;
        let text = results[0].outcome.text();
        assert!(text.starts_with("Error: Network error: connection refused"));
        assert!(text.contains("check your connection"));
    }

    #[tokio::test]
    async fn test_service_error_is_not_cached() {
        let transport = MockTransport::new()
            .reply(HttpReply::ok(r#"{"body":"{\"error\":\"model overloaded\"}"}"#))
            .reply(HttpReply::ok(r#"{"explanations":[{"lineNumber":1,"explanation":"ok"}]}"#));
        let mut client = client(transport);
        let one = [CodeUnit::line(0, "go();")];

        let first = client.interpret_units(&one, TargetLanguage::English).await;
        assert_eq!(first[0].outcome, Outcome::Error("Error: model overloaded".to_string()));

        let second = client.interpret_units(&one, TargetLanguage::English).await;
        assert_eq!(second[0].outcome, Outcome::Explanation("ok".to_string()));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let mut client = client(MockTransport::new());
        assert!(client.interpret_units(&[], TargetLanguage::English).await.is_empty());
        assert_eq!(client.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn test_interpret_one() {
        let transport = MockTransport::new()
            .reply(HttpReply::ok(r#"{"explanation":"  Adds one to x. "}"#))
            .reply(HttpReply {
                status: 400,
                status_text: "Bad Request".to_string(),
                body: "nope".to_string(),
            });
        let mut client = client(transport);

        let text = client.interpret_one("x++", TargetLanguage::English).await.unwrap();
        assert_eq!(text, "Adds one to x.");

        // Cached: the queued 400 is never consumed
        let again = client.interpret_one("x++", TargetLanguage::English).await.unwrap();
        assert_eq!(again, text);
        assert_eq!(client.transport().request_count(), 1);

        let err = client.interpret_one("y--", TargetLanguage::English).await.unwrap_err();
        assert_eq!(err.display_text(), "Error: Server error: Bad Request");
    }

    #[tokio::test]
    async fn test_interpret_one_blank_explanation() {
        let transport = MockTransport::new().reply(HttpReply::ok(r#"{"explanation":""}"#));
        let mut client = client(transport);
        let text = client.interpret_one("z", TargetLanguage::English).await.unwrap();
        assert_eq!(text, NO_EXPLANATION);
    }
}
