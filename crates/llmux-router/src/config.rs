//! Router configuration.
//!
//! Deserializes from TOML. Provider order in the `providers` list is the
//! candidate priority order for every dispatch.

use llmux_core::{LlmuxError, LlmuxResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which provider API family a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI's own API.
    OpenAi,
    /// DeepSeek — OpenAI-compatible API, cheaper primary in most setups.
    DeepSeek,
    /// OpenRouter aggregation gateway.
    OpenRouter,
    /// Groq cloud inference — OpenAI-compatible API, free tier with rate limits.
    Groq,
}

/// Configuration for a single provider. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable identifier used in health state, stats, and logs.
    pub name: String,
    /// API family of this provider.
    pub kind: ProviderKind,
    /// Default model to request.
    pub model: String,
    /// Optional heavier model used when a request scores as complex.
    #[serde(default)]
    pub reasoning_model: Option<String>,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Override for the API base URL (defaults per [`ProviderKind`]).
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum retries on this provider before failing over.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Sampling temperature sent with every completion call.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_temperature() -> f64 {
    0.7
}

impl ProviderConfig {
    /// The API base URL, honoring an explicit override.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.kind {
                ProviderKind::OpenAi => "https://api.openai.com",
                ProviderKind::DeepSeek => "https://api.deepseek.com",
                ProviderKind::OpenRouter => "https://openrouter.ai/api",
                ProviderKind::Groq => "https://api.groq.com/openai",
            }
        }
    }

    /// The per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the dispatch layer as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Providers in candidate priority order. Must not be empty.
    pub providers: Vec<ProviderConfig>,
    /// Fixed cooldown window after a provider is marked unhealthy.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Capacity of the bounded call-attempt log.
    #[serde(default = "default_attempt_log_capacity")]
    pub attempt_log_capacity: usize,
    /// Whether to score request complexity and route to `reasoning_model`.
    #[serde(default = "default_true")]
    pub auto_complexity_detection: bool,
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_attempt_log_capacity() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

impl RouterConfig {
    /// Parses a config from a TOML string and validates it.
    pub fn from_toml(raw: &str) -> LlmuxResult<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| LlmuxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a TOML file and validates it.
    pub fn from_toml_file(path: impl AsRef<Path>) -> LlmuxResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// The cooldown window as a [`Duration`].
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    fn validate(&self) -> LlmuxResult<()> {
        if self.providers.is_empty() {
            return Err(LlmuxError::Config(
                "at least one provider must be configured".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for p in &self.providers {
            if !seen.insert(p.name.as_str()) {
                return Err(LlmuxError::Config(format!(
                    "duplicate provider name: {}",
                    p.name
                )));
            }
        }
        Ok(())
    }
}
