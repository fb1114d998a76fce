//! Shared types for the llmux workspace.
//!
//! This crate provides the small foundation shared by every llmux crate:
//! the unified error enum, a `Result` alias, and the chat message types
//! that flow through the dispatch layer.
//!
//! # Main types
//!
//! - [`LlmuxError`] — Unified error enum for configuration and I/O faults.
//! - [`LlmuxResult`] — Convenience alias for `Result<T, LlmuxError>`.
//! - [`Role`] — Message role (user, assistant, system).
//! - [`Message`] — A single chat message in a completion request.

use serde::{Deserialize, Serialize};

// --- Error types ---

/// Top-level error type for llmux.
#[derive(Debug, thiserror::Error)]
pub enum LlmuxError {
    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`LlmuxError`].
pub type LlmuxResult<T> = Result<T, LlmuxError>;

// --- Message types ---

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
    /// A system-level instruction or prompt.
    System,
}

/// A single chat message within a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The textual content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a new message with [`Role::System`].
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");

        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = Message::system("You are terse.");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::System);
        assert_eq!(back.content, "You are terse.");
    }

    #[test]
    fn test_error_display() {
        let err = LlmuxError::Config("no providers configured".into());
        assert_eq!(err.to_string(), "Config error: no providers configured");
    }
}
