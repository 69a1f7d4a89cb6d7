//! Whisper client.
//!
//! One HTTP client is built per transcriber and reused across calls so
//! connections to the API stay pooled.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::super::{STTError, Transcriber};
use super::config::{MAX_FILE_SIZE_BYTES, ResponseFormat, WhisperConfig};
use super::messages::{TranscriptionResponse, describe_error};

pub struct WhisperTranscriber {
    config: WhisperConfig,
    http_client: Client,
}

impl WhisperTranscriber {
    pub fn new(config: WhisperConfig) -> Result<Self, STTError> {
        config.validate().map_err(STTError::ConfigurationError)?;

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                STTError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    fn build_form(&self, wav: Bytes) -> Result<Form, STTError> {
        let file_part = Part::bytes(wav.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| STTError::ConfigurationError(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.as_str())
            .text("response_format", self.config.response_format.as_str());

        if !self.config.language.is_empty() {
            form = form.text("language", self.config.language.clone());
        }
        Ok(form)
    }

    fn parse_response(&self, body: &str) -> Result<String, STTError> {
        match self.config.response_format {
            ResponseFormat::Json => serde_json::from_str::<TranscriptionResponse>(body)
                .map(|r| r.text)
                .map_err(|e| STTError::ProviderError(format!("Failed to parse response: {e}"))),
            ResponseFormat::Text => Ok(body.to_string()),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, wav: Bytes) -> Result<String, STTError> {
        if wav.len() > MAX_FILE_SIZE_BYTES {
            return Err(STTError::AudioProcessingError(format!(
                "Audio payload ({} bytes) exceeds maximum file size ({} bytes)",
                wav.len(),
                MAX_FILE_SIZE_BYTES
            )));
        }

        debug!(bytes = wav.len(), model = %self.config.model, "Sending audio to Whisper");
        let form = self.build_form(wav)?;

        let response = self
            .http_client
            .post(self.config.api_url())
            .bearer_auth(self.config.api_key.expose())
            .multipart(form)
            .send()
            .await
            .map_err(|e| STTError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| STTError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = describe_error(status, &body);
            return Err(if status.as_u16() == 401 {
                STTError::AuthenticationFailed(message)
            } else {
                STTError::ProviderError(message)
            });
        }

        let text = self.parse_response(&body)?;
        info!(chars = text.len(), "Whisper transcription received");
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "openai-whisper"
    }
}
