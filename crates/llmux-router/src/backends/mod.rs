//! Provider adapters.
//!
//! An adapter turns a chat completion request into one provider call and
//! reports failures as typed [`ProviderError`]s. The dispatcher never looks
//! at raw error text; classification works entirely off [`ErrorKind`], so
//! adding a provider means implementing this trait and nothing else.

pub mod openai;

use crate::classify::ErrorKind;
use async_trait::async_trait;
use llmux_core::Message;
use std::time::Duration;

/// A provider failure with its typed kind preserved.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    /// Typed failure kind driving classification.
    pub kind: ErrorKind,
    /// Provider-supplied detail, for logs and attempt history.
    pub message: String,
}

impl ProviderError {
    /// Creates a provider error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Trait for LLM provider adapters.
///
/// Implementations perform exactly one upstream call per invocation; all
/// retry and failover behavior lives in the dispatcher.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Requests a chat completion for `messages` using `model`.
    ///
    /// `timeout` is the per-call deadline the adapter should apply to its
    /// own transport; the dispatcher enforces it independently as well.
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError>;
}
