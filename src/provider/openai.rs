//! OpenAI-compatible chat-completions adapter.

use super::{
    Completion, CompletionClient, CompletionError, CompletionErrorKind, CompletionOptions,
    TokenUsage,
};
use crate::config::LlmConfig;
use crate::session::Role;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Sentinel left in sample configs; treated the same as no key at all.
const PLACEHOLDER_API_KEY: &str = "sk-your-key-here";

/// OpenAI-compatible completion client.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
    default_max_tokens: i64,
    default_temperature: f64,
}

impl OpenAiClient {
    /// Build a client from the LLM configuration section.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            &config.base_url,
            &config.model,
            config.max_tokens,
            config.temperature,
        )
    }

    /// Build a client with explicit settings. `base_url` supports
    /// compatible endpoints and test servers.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
        default_max_tokens: i64,
        default_temperature: f64,
    ) -> Self {
        let api_key = api_key.into();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.into(),
            default_model: default_model.into(),
            default_max_tokens,
            default_temperature,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[(Role, String)],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let request = OpenAiRequest {
            model: model.clone(),
            messages: messages
                .iter()
                .map(|(role, content)| OpenAiMessage {
                    role: role.as_str(),
                    content: content.clone(),
                })
                .collect(),
            max_tokens: options.max_tokens.unwrap_or(self.default_max_tokens),
            temperature: options
                .temperature
                .unwrap_or(self.default_temperature)
                .clamp(0.0, 1.0),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError {
                kind: CompletionErrorKind::Network,
                message: format!("Request failed: {}", e),
                provider_code: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError {
                kind: CompletionErrorKind::Provider,
                message: format!("API error: {}", body),
                provider_code: Some(status.as_u16()),
            });
        }

        let parsed: OpenAiResponse = response.json().await.map_err(|e| CompletionError {
            kind: CompletionErrorKind::Malformed,
            message: format!("Failed to parse response: {}", e),
            provider_code: None,
        })?;

        let text = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(Completion {
            text,
            model: parsed.model,
            usage: TokenUsage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
                total_tokens: parsed.usage.total_tokens,
            },
        })
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: i64,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: OpenAiUsage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: i64,
    completion_tokens: i64,
    total_tokens: i64,
}
