//! Completion boundary: the outbound call to the LLM provider.
//!
//! Everything behind [`CompletionClient`] is an opaque remote function;
//! the adapter converts every failure mode into a [`CompletionError`]
//! value before it crosses back into the request handlers.

mod openai;

pub use openai::OpenAiClient;

use crate::session::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Unified interface to the completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the full conversation history and receive one completion.
    async fn complete(
        &self,
        messages: &[(Role, String)],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionError>;

    /// Whether a usable credential is configured. Never touches the network.
    fn is_ready(&self) -> bool;
}

/// Per-request generation overrides. Omitted fields fall back to the
/// configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub max_tokens: Option<i64>,
    pub temperature: Option<f64>,
}

/// A successful completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// Failure category at the completion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionErrorKind {
    /// Transport-level failure: the provider was never reached.
    Network,
    /// The provider answered with an error status.
    Provider,
    /// The provider answered 2xx but the body did not parse.
    Malformed,
}

/// Error from the completion boundary.
#[derive(Debug, Clone)]
pub struct CompletionError {
    pub kind: CompletionErrorKind,
    pub message: String,
    /// HTTP status reported by the provider, when one was received.
    pub provider_code: Option<u16>,
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.provider_code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for CompletionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: CompletionOptions =
            serde_json::from_str(r#"{"model":"gpt-4o","maxTokens":256,"temperature":0.2}"#)
                .unwrap();
        assert_eq!(options.model.as_deref(), Some("gpt-4o"));
        assert_eq!(options.max_tokens, Some(256));
        assert_eq!(options.temperature, Some(0.2));
    }

    #[test]
    fn test_usage_serialize_camel_case() {
        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        let json = serde_json::to_string(&usage).unwrap();
        assert!(json.contains("promptTokens"));
        assert!(json.contains("completionTokens"));
        assert!(json.contains("totalTokens"));
    }

    #[test]
    fn test_error_display() {
        let err = CompletionError {
            kind: CompletionErrorKind::Provider,
            message: "quota exceeded".into(),
            provider_code: Some(429),
        };
        assert_eq!(err.to_string(), "[429] quota exceeded");

        let err = CompletionError {
            kind: CompletionErrorKind::Network,
            message: "connection refused".into(),
            provider_code: None,
        };
        assert_eq!(err.to_string(), "connection refused");
    }
}
