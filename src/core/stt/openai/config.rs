//! Configuration types for the Whisper transcription endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_OPENAI_BASE_URL, Secret, ServerConfig};

/// Upper bound on an uploaded file. The API limit is 25 MB.
pub const MAX_FILE_SIZE_BYTES: usize = 25 * 1024 * 1024;

/// Supported OpenAI transcription models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhisperModel {
    #[default]
    #[serde(rename = "whisper-1")]
    Whisper1,
    #[serde(rename = "gpt-4o-transcribe")]
    Gpt4oTranscribe,
    #[serde(rename = "gpt-4o-mini-transcribe")]
    Gpt4oMiniTranscribe,
}

impl WhisperModel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whisper1 => "whisper-1",
            Self::Gpt4oTranscribe => "gpt-4o-transcribe",
            Self::Gpt4oMiniTranscribe => "gpt-4o-mini-transcribe",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "whisper-1" | "whisper1" | "whisper" => Self::Whisper1,
            "gpt-4o-transcribe" | "gpt4o-transcribe" => Self::Gpt4oTranscribe,
            "gpt-4o-mini-transcribe" | "gpt4o-mini-transcribe" => Self::Gpt4oMiniTranscribe,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response body format requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// `{"text": "..."}`
    #[default]
    Json,
    /// Bare transcript text
    Text,
}

impl ResponseFormat {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub api_key: Secret,
    /// API root including the version segment, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: WhisperModel,
    /// ISO-639-1 hint; empty lets the model detect the language
    pub language: String,
    pub response_format: ResponseFormat,
    pub request_timeout: Duration,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(""),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: WhisperModel::default(),
            language: crate::config::DEFAULT_LANGUAGE.to_string(),
            response_format: ResponseFormat::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl WhisperConfig {
    /// Build from server configuration. Requires an OpenAI key.
    pub fn from_server_config(config: &ServerConfig) -> Result<Self, String> {
        Ok(Self {
            api_key: config.get_api_key("openai")?,
            base_url: config.providers.openai_base_url.clone(),
            model: WhisperModel::from_str_or_default(&config.speech.whisper_model),
            language: config.speech.language.clone(),
            response_format: ResponseFormat::Json,
            request_timeout: config.calls.downstream_timeout(),
        })
    }

    pub fn api_url(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("OpenAI API key is required".to_string());
        }
        if self.base_url.trim().is_empty() {
            return Err("OpenAI base URL is required".to_string());
        }
        Ok(())
    }
}
