//! Language model integration.
//!
//! The proposal workflow talks to a single OpenAI-compatible
//! chat-completions endpoint (Groq by default) through [`ChatModel`].

mod openai;

pub use openai::OpenAICompatibleProvider;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
}

/// A single chat-completions message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Trait for chat models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the assistant's reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AIError>;

    /// Get the provider name.
    fn name(&self) -> &str;
}

/// AI error types.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("API key missing: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("No response from AI")]
    NoResponse,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AIError {
    /// Minimum wait before another attempt, or `None` when retrying
    /// cannot help.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(secs) => Some(Duration::from_secs(*secs)),
            Self::Http(_) => Some(Duration::ZERO),
            Self::ApiError { status, .. } if *status >= 500 => Some(Duration::ZERO),
            Self::ApiError { .. } | Self::MissingApiKey(_) | Self::NoResponse => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_with_lowercase_role() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn test_retry_delays() {
        assert_eq!(AIError::RateLimited(7).retry_delay(), Some(Duration::from_secs(7)));
        assert_eq!(
            AIError::ApiError { status: 503, message: String::new() }.retry_delay(),
            Some(Duration::ZERO)
        );
        assert_eq!(AIError::ApiError { status: 401, message: String::new() }.retry_delay(), None);
        assert_eq!(AIError::NoResponse.retry_delay(), None);
        assert_eq!(AIError::MissingApiKey("GROQ_API_KEY".to_string()).retry_delay(), None);
    }
}
