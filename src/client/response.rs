//! Response shapes returned by the explanation endpoint.
//!
//! Payloads come either flat (`{"explanations": [...]}`) or wrapped one
//! level deep as a JSON string (`{"body": "{\"explanations\": [...]}"}`).
//! Both are decoded into the same payload types; an `error` field at
//! either level fails the whole request.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ClientError;

/// Longest raw-body excerpt quoted in error messages.
pub const EXCERPT_LEN: usize = 200;

/// Request body for a batch of lines.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest<'a> {
    pub code_lines: Vec<&'a str>,
    pub language: &'a str,
}

/// Request body for a single line or block.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleRequest<'a> {
    pub code_line: &'a str,
    pub language: &'a str,
}

/// One explanation in a batch response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationEntry {
    /// 1-based index into the request's `codeLines`
    pub line_number: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Flat batch payload. `Failure` is tried first so an `error` field wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BatchPayload {
    Failure { error: String },
    Explanations { explanations: Vec<ExplanationEntry> },
}

/// Flat single payload.
///
/// `explanation` is required so that a `{"body": ...}` envelope never
/// decodes as a flat payload with nothing in it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SinglePayload {
    Failure { error: String },
    Explanation { explanation: String },
}

/// A payload as it arrives on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Flat(T),
    Wrapped { body: String },
}

/// Payloads that may carry a service-level error.
pub trait Payload: DeserializeOwned {
    fn service_error(&self) -> Option<&str>;
}

impl Payload for BatchPayload {
    fn service_error(&self) -> Option<&str> {
        match self {
            BatchPayload::Failure { error } => Some(error),
            BatchPayload::Explanations { .. } => None,
        }
    }
}

impl Payload for SinglePayload {
    fn service_error(&self) -> Option<&str> {
        match self {
            SinglePayload::Failure { error } => Some(error),
            SinglePayload::Explanation { .. } => None,
        }
    }
}

/// Decode a 2xx response body, unwrapping a `body` envelope once.
pub fn decode<T: Payload>(raw: &str) -> Result<T, ClientError> {
    let invalid = || ClientError::InvalidResponse {
        excerpt: excerpt(raw),
    };

    let payload = match serde_json::from_str::<Envelope<T>>(raw).map_err(|_| invalid())? {
        Envelope::Flat(payload) => payload,
        Envelope::Wrapped { body } => serde_json::from_str::<T>(&body).map_err(|_| invalid())?,
    };

    match payload.service_error() {
        Some(message) => Err(ClientError::Service(message.to_string())),
        None => Ok(payload),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Best-effort message for a non-2xx response.
///
/// Prefers an `error` or `message` field in the body, then the status
/// text, then a truncated copy of the raw body.
pub fn server_error_message(status_text: &str, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            if !message.trim().is_empty() {
                return message;
            }
        }
    }
    if !status_text.trim().is_empty() {
        return status_text.to_string();
    }
    excerpt(body)
}

/// Truncate `raw` to `EXCERPT_LEN` characters.
pub fn excerpt(raw: &str) -> String {
    raw.chars().take(EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_request_shape() {
        let request = BatchRequest {
            code_lines: vec!["const x = 10;"],
            language: "English",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"codeLines": ["const x = 10;"], "language": "English"})
        );

        let single = SingleRequest {
            code_line: "x++",
            language: "Korean",
        };
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            serde_json::json!({"codeLine": "x++", "language": "Korean"})
        );
    }

    #[test]
    fn test_decode_flat_batch() {
        let raw = r#"{"explanations":[{"lineNumber":1,"explanation":"Declares x"}]}"#;
        let payload: BatchPayload = decode(raw).unwrap();
        assert_eq!(
            payload,
            BatchPayload::Explanations {
                explanations: vec![ExplanationEntry {
                    line_number: 1,
                    explanation: Some("Declares x".to_string()),
                }]
            }
        );
    }

    #[test]
    fn test_wrapped_and_flat_decode_identically() {
        let flat = r#"{"explanations":[{"lineNumber":1,"explanation":"a"},{"lineNumber":2,"explanation":"b"}]}"#;
        let wrapped = serde_json::json!({ "body": flat }).to_string();

        let a: BatchPayload = decode(flat).unwrap();
        let b: BatchPayload = decode(&wrapped).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_error_field_at_either_level() {
        let outer = r#"{"error":"quota exceeded"}"#;
        assert!(matches!(
            decode::<BatchPayload>(outer),
            Err(ClientError::Service(m)) if m == "quota exceeded"
        ));

        let nested = serde_json::json!({ "body": outer }).to_string();
        assert!(matches!(
            decode::<BatchPayload>(&nested),
            Err(ClientError::Service(m)) if m == "quota exceeded"
        ));
    }

    #[test]
    fn test_error_wins_over_explanations() {
        let raw = r#"{"error":"partial","explanations":[]}"#;
        assert!(matches!(
            decode::<BatchPayload>(raw),
            Err(ClientError::Service(_))
        ));
    }

    #[test]
    fn test_malformed_body_is_invalid_response() {
        let raw = format!("<html>{}</html>", "x".repeat(500));
        match decode::<SinglePayload>(&raw) {
            Err(ClientError::InvalidResponse { excerpt }) => {
                assert_eq!(excerpt.chars().count(), EXCERPT_LEN);
                assert!(excerpt.starts_with("<html>"));
            }
            other => panic!("expected invalid response, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapped_body_must_be_json() {
        let raw = r#"{"body":"not json"}"#;
        assert!(matches!(
            decode::<SinglePayload>(raw),
            Err(ClientError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_wrapped_single() {
        let raw = serde_json::json!({ "body": r#"{"explanation":"Loops"}"# }).to_string();
        let payload: SinglePayload = decode(&raw).unwrap();
        assert_eq!(
            payload,
            SinglePayload::Explanation {
                explanation: "Loops".to_string()
            }
        );
    }

    #[test]
    fn test_decode_single() {
        let payload: SinglePayload = decode(r#"{"explanation":"Adds one"}"#).unwrap();
        assert_eq!(
            payload,
            SinglePayload::Explanation {
                explanation: "Adds one".to_string()
            }
        );
    }

    #[test]
    fn test_server_error_message_fallbacks() {
        assert_eq!(
            server_error_message("Internal Server Error", r#"{"error":"rate limited"}"#),
            "rate limited"
        );
        assert_eq!(
            server_error_message("Bad Request", r#"{"message":"missing codeLine"}"#),
            "missing codeLine"
        );
        assert_eq!(server_error_message("Bad Gateway", "oops"), "Bad Gateway");
        let long = "z".repeat(300);
        assert_eq!(server_error_message("", &long).len(), EXCERPT_LEN);
    }
}
