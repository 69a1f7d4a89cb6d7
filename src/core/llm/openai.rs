use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatCompletion, ChatMessage, LLMError};
use crate::config::{DEFAULT_OPENAI_BASE_URL, Secret, ServerConfig};
use crate::core::stt::openai::describe_error;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Secret,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(""),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: crate::config::DEFAULT_CHAT_MODEL.to_string(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
            max_tokens: crate::config::DEFAULT_MAX_OUTPUT_TOKENS,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ChatConfig {
    pub fn from_server_config(config: &ServerConfig) -> Result<Self, String> {
        Ok(Self {
            api_key: config.get_api_key("openai")?,
            base_url: config.providers.openai_base_url.clone(),
            model: config.dialogue.chat_model.clone(),
            temperature: config.dialogue.temperature,
            max_tokens: config.dialogue.max_output_tokens,
            request_timeout: config.calls.downstream_timeout(),
        })
    }

    pub fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAIChat {
    config: ChatConfig,
    http_client: Client,
}

impl OpenAIChat {
    pub fn new(config: ChatConfig) -> Result<Self, LLMError> {
        if config.api_key.is_empty() {
            return Err(LLMError::ConfigurationError(
                "OpenAI API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                LLMError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl ChatCompletion for OpenAIChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LLMError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Requesting chat completion"
        );

        let response = self
            .http_client
            .post(self.config.api_url())
            .bearer_auth(self.config.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = describe_error(status, &text);
            return Err(if status.as_u16() == 401 {
                LLMError::AuthenticationFailed(message)
            } else {
                LLMError::ProviderError(message)
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| LLMError::ProviderError(format!("Failed to parse response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &'static str {
        "openai-chat"
    }
}
