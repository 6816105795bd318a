//! Service configuration.
//!
//! Loaded from an optional JSON file (`TUTOR_CONFIG` path override) with
//! environment-variable overrides on top; every field has a safe default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3465
}

/// Completion-provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; absent or placeholder means the /chat endpoint reports 503.
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> i64 {
    1024
}

fn default_temperature() -> f64 {
    0.7
}

/// Session-store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum messages kept per session, system message included.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Sessions idle strictly longer than this are swept.
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            expiry_minutes: default_expiry_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_max_history() -> usize {
    20
}

fn default_expiry_minutes() -> i64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration: file if present, then env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("TUTOR_CONFIG") {
            Ok(path) => Self::load_from(&PathBuf::from(path))?,
            Err(_) => {
                tracing::debug!("TUTOR_CONFIG not set, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("TUTOR_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("TUTOR_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("TUTOR_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("TUTOR_MODEL") {
            self.llm.model = model;
        }
        if let Ok(max_tokens) = std::env::var("TUTOR_MAX_TOKENS") {
            if let Ok(n) = max_tokens.parse() {
                self.llm.max_tokens = n;
            }
        }
        if let Ok(temperature) = std::env::var("TUTOR_TEMPERATURE") {
            if let Ok(t) = temperature.parse() {
                self.llm.temperature = t;
            }
        }

        if let Ok(max_history) = std::env::var("TUTOR_MAX_HISTORY") {
            if let Ok(n) = max_history.parse() {
                self.session.max_history = n;
            }
        }
        if let Ok(expiry) = std::env::var("TUTOR_EXPIRY_MINUTES") {
            if let Ok(n) = expiry.parse() {
                self.session.expiry_minutes = n;
            }
        }
        if let Ok(interval) = std::env::var("TUTOR_SWEEP_INTERVAL_SECS") {
            if let Ok(n) = interval.parse() {
                self.session.sweep_interval_secs = n;
            }
        }

        if let Ok(level) = std::env::var("TUTOR_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("TUTOR_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Clamp values that would break invariants downstream.
    fn normalize(&mut self) {
        if self.session.max_history < 2 {
            tracing::warn!(
                configured = self.session.max_history,
                "max_history below 2, clamping"
            );
            self.session.max_history = 2;
        }
        self.llm.temperature = self.llm.temperature.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3465);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.session.max_history, 20);
        assert_eq!(config.session.expiry_minutes, 60);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"session": {"max_history": 8}}"#).unwrap();
        assert_eq!(config.session.max_history, 8);
        assert_eq!(config.session.expiry_minutes, 60);
        assert_eq!(config.server.port, 3465);
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("TUTOR_PORT", "9090");
        std::env::set_var("TUTOR_MAX_HISTORY", "12");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.session.max_history, 12);

        std::env::remove_var("TUTOR_PORT");
        std::env::remove_var("TUTOR_MAX_HISTORY");
    }

    #[test]
    fn test_normalize_clamps() {
        let mut config = Config::default();
        config.session.max_history = 0;
        config.llm.temperature = 2.5;
        config.normalize();
        assert_eq!(config.session.max_history, 2);
        assert_eq!(config.llm.temperature, 1.0);
    }
}
