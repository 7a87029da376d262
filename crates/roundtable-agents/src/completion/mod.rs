//! Chat completion contract shared by every roundtable call.
//!
//! A [`CompletionProvider`] talks to one backend. The [`CompletionClient`]
//! wraps a provider with the rate-limit retry policy; executors only ever
//! see the client.

pub mod client;
pub mod openai;
pub mod sse;

use std::time::Duration;

use async_trait::async_trait;
use coordination::PromptPair;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::config::StageParams;

pub use client::{Completion, CompletionClient};
pub use openai::OpenAiProvider;

/// Incremental text fragments of a streamed completion.
pub type FragmentStream = BoxStream<'static, Result<String, CompletionError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One chat completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// System + user request with the sampling settings of one stage.
    pub fn new(prompt: &PromptPair, params: StageParams, stream: bool) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(prompt.system.clone()),
                ChatMessage::user(prompt.user.clone()),
            ],
            stream,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }

    pub fn system_text(&self) -> &str {
        self.text_of(Role::System)
    }

    pub fn user_text(&self) -> &str {
        self.text_of(Role::User)
    }

    fn text_of(&self, role: Role) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Errors surfaced by a provider or the client around it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("Rate limited by provider: {message}")]
    RateLimited {
        /// `Retry-After` hint, when the provider sent one.
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Provider returned no completion text")]
    EmptyResponse,
}

impl CompletionError {
    /// The only class of failure the client retries.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// A chat completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whole reply in one piece.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// Reply as it is generated. Rate limiting is reported by the
    /// returned future, before any fragment is yielded.
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_prompt_pair() {
        let prompt = PromptPair {
            system: "You are the Editor.".into(),
            user: "Cut it.".into(),
        };
        let params = StageParams {
            temperature: 0.5,
            max_tokens: 2000,
        };
        let request = CompletionRequest::new(&prompt, params, true);
        assert!(request.stream);
        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.system_text(), "You are the Editor.");
        assert_eq!(request.user_text(), "Cut it.");
    }

    #[test]
    fn test_rate_limit_classification() {
        let limited = CompletionError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
            message: "slow down".into(),
        };
        assert!(limited.is_rate_limited());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));

        let http = CompletionError::Http {
            status: 500,
            body: "oops".into(),
        };
        assert!(!http.is_rate_limited());
        assert_eq!(http.retry_after(), None);
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_value(ChatMessage::system("hi")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hi");
    }
}
