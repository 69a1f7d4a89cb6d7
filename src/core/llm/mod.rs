//! Text generation for the generative dialogue policy.

mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::{ChatConfig, OpenAIChat};

use crate::core::session::Role;

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("LLM configuration error: {0}")]
    ConfigurationError(String),
    #[error("LLM network error: {0}")]
    NetworkError(String),
    #[error("LLM authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("LLM provider error: {0}")]
    ProviderError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A chat completion backend.
///
/// Returns the assistant text, or an empty string when the provider produced
/// no choices.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LLMError>;

    fn provider_name(&self) -> &'static str;
}
