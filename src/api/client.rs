//! The model call boundary.
//!
//! [`ModelClient`] is the only seam that touches the network: any provider
//! that can turn (system instruction, conversation, sampling parameters)
//! into text satisfies it. [`HttpModelClient`] speaks the OpenAI-compatible
//! chat-completions dialect, non-streaming.

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use tracing::debug;

use crate::api::{
    ApiMessage, ChatCompletionRequest, ChatCompletionResponse, SamplingParams,
};
use crate::core::message::Message;

/// Transport failure taxonomy. Every variant is recoverable: the session
/// surfaces it and waits for the user to dismiss and retry.
#[derive(Debug)]
pub enum ApiError {
    /// The provider rejected the API key.
    Auth,
    /// Rate or billing quota exhausted.
    Quota,
    /// The provider's safety layer refused to answer.
    ContentBlocked,
    /// The call succeeded but carried no usable text.
    Empty,
    /// Anything else: network failures, malformed payloads, 5xx bodies.
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Auth => {
                write!(f, "Invalid API key. Please check your API key configuration.")
            }
            ApiError::Quota => write!(
                f,
                "API quota exceeded. Please try again later or check your billing settings."
            ),
            ApiError::ContentBlocked => write!(
                f,
                "Content was blocked by safety filters. Please rephrase your question."
            ),
            ApiError::Empty => write!(f, "Empty response from API."),
            ApiError::Other(detail) => write!(f, "Technical system error: {}", detail),
        }
    }
}

impl StdError for ApiError {}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one completion over the full conversation so far.
    async fn generate(
        &self,
        instruction: &str,
        messages: &[Message],
        sampling: &SamplingParams,
    ) -> Result<String, ApiError>;
}

pub struct HttpModelClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpModelClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn generate(
        &self,
        instruction: &str,
        messages: &[Message],
        sampling: &SamplingParams,
    ) -> Result<String, ApiError> {
        let mut api_messages = vec![ApiMessage {
            role: "system".to_string(),
            content: instruction.to_string(),
        }];
        api_messages.extend(messages.iter().map(|m| ApiMessage {
            role: m.role.to_api_role().to_string(),
            content: m.content.clone(),
        }));

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: api_messages,
            stream: false,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            top_k: sampling.top_k,
            max_tokens: sampling.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| ApiError::Other(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "model call failed");
            return Err(classify_http_failure(status.as_u16(), &body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ApiError::Other(err.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ApiError::Empty);
        }
        Ok(content)
    }
}

/// Map a failed HTTP exchange onto the error taxonomy. Status codes decide
/// the clear cases; otherwise the body summary is inspected for the
/// provider's wording.
fn classify_http_failure(status: u16, body: &str) -> ApiError {
    match status {
        401 | 403 => ApiError::Auth,
        429 => ApiError::Quota,
        _ => {
            let summary = extract_error_summary(body)
                .unwrap_or_else(|| collapse_whitespace(body));
            let lower = summary.to_lowercase();
            if lower.contains("api key") || lower.contains("unauthorized") {
                ApiError::Auth
            } else if lower.contains("quota") {
                ApiError::Quota
            } else if lower.contains("blocked") || lower.contains("safety") {
                ApiError::ContentBlocked
            } else if summary.is_empty() {
                ApiError::Other(format!("HTTP {status}"))
            } else {
                ApiError::Other(summary)
            }
        }
    }
}

/// Pull a human-readable message out of a provider error body. Handles the
/// common shapes: `{"error":{"message":...}}`, `{"error":"..."}` and
/// `{"message":...}`.
fn extract_error_summary(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        })?;

    let collapsed = collapse_whitespace(&summary);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_quota_map_from_status_codes() {
        assert!(matches!(classify_http_failure(401, ""), ApiError::Auth));
        assert!(matches!(classify_http_failure(403, "{}"), ApiError::Auth));
        assert!(matches!(classify_http_failure(429, ""), ApiError::Quota));
    }

    #[test]
    fn body_wording_refines_generic_statuses() {
        let blocked = r#"{"error":{"message":"Response blocked by safety filters"}}"#;
        assert!(matches!(
            classify_http_failure(400, blocked),
            ApiError::ContentBlocked
        ));

        let quota = r#"{"error":{"message":"Daily quota exceeded for project"}}"#;
        assert!(matches!(classify_http_failure(400, quota), ApiError::Quota));

        let bad_key = r#"{"error":"API key not valid"}"#;
        assert!(matches!(classify_http_failure(400, bad_key), ApiError::Auth));
    }

    #[test]
    fn unknown_failures_carry_the_summary() {
        let body = r#"{"error":{"message":"model   overloaded,  please retry"}}"#;
        match classify_http_failure(500, body) {
            ApiError::Other(detail) => assert_eq!(detail, "model overloaded, please retry"),
            other => panic!("expected Other, got {:?}", other),
        }
    }

    #[test]
    fn bodyless_failures_fall_back_to_the_status() {
        match classify_http_failure(502, "") {
            ApiError::Other(detail) => assert_eq!(detail, "HTTP 502"),
            other => panic!("expected Other, got {:?}", other),
        }
    }

    #[test]
    fn summary_extraction_handles_the_common_shapes() {
        assert_eq!(
            extract_error_summary(r#"{"error":{"message":"internal server error"}}"#).as_deref(),
            Some("internal server error")
        );
        assert_eq!(
            extract_error_summary(r#"{"error":"rate limited"}"#).as_deref(),
            Some("rate limited")
        );
        assert_eq!(
            extract_error_summary(r#"{"message":"not found"}"#).as_deref(),
            Some("not found")
        );
        assert_eq!(extract_error_summary("<html>bad gateway</html>"), None);
        assert_eq!(extract_error_summary(r#"{"status":"failed"}"#), None);
    }

    #[test]
    fn completions_url_tolerates_trailing_slashes() {
        let client = HttpModelClient::new("https://api.example.com/v1/", "sk-test", "m");
        assert_eq!(
            client.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }
}
