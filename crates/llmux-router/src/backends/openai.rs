//! OpenAI-compatible API adapter.
//!
//! Works with OpenAI, DeepSeek, OpenRouter, Groq, and any other provider
//! that implements the OpenAI chat completions API. HTTP and transport
//! failures are mapped to typed [`ErrorKind`]s at this boundary.

use super::{ProviderAdapter, ProviderError};
use crate::classify::ErrorKind;
use crate::config::{ProviderConfig, ProviderKind};
use async_trait::async_trait;
use llmux_core::{Message, Role};
use std::time::Duration;

/// Adapter for OpenAI-compatible chat completion endpoints.
pub struct OpenAiAdapter {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl OpenAiAdapter {
    /// Creates an adapter for the given provider.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::System => "system",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter requires attribution headers
        if matches!(self.config.kind, ProviderKind::OpenRouter) {
            request
                .header("HTTP-Referer", "https://github.com/llmux/llmux")
                .header("X-Title", "llmux")
        } else {
            request
        }
    }
}

fn kind_for_status(status: reqwest::StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 | 403 => ErrorKind::Auth,
        429 => ErrorKind::RateLimit,
        400 => ErrorKind::InvalidRequest,
        500 | 502 | 503 | 529 => ErrorKind::Overloaded,
        _ => ErrorKind::Unknown,
    }
}

fn kind_for_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() || err.is_request() {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = serde_json::json!({
            "model": model,
            "messages": self.build_messages(messages),
            "temperature": self.config.temperature,
        });

        let request = self.add_provider_headers(self.http.post(&url)).timeout(timeout);

        let resp = request
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(kind_for_transport(&e), e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .text()
                .await
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(ProviderError::new(
                kind_for_status(status),
                format!("API error {status}: {detail}"),
            ));
        }

        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::new(ErrorKind::Network, e.to_string()))?;

        resp_body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| {
                ProviderError::new(
                    ErrorKind::Unknown,
                    format!("response missing message content: {resp_body}"),
                )
            })
    }
}
