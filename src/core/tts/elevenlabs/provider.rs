use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::config::{ElevenLabsConfig, VoiceSettings};
use crate::core::tts::{SpeechSynthesizer, SynthesizedAudio, TTSError, TTSResult};

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

pub struct ElevenLabsTTS {
    config: ElevenLabsConfig,
    http_client: Client,
}

impl ElevenLabsTTS {
    pub fn new(config: ElevenLabsConfig) -> TTSResult<Self> {
        config.validate().map_err(TTSError::InvalidConfiguration)?;

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                TTSError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    fn build_http_request(&self, text: &str) -> TTSResult<reqwest::RequestBuilder> {
        let url = self
            .config
            .api_url()
            .map_err(TTSError::InvalidConfiguration)?;
        let body = SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: self.config.voice_settings,
        };

        Ok(self
            .http_client
            .post(url)
            .header("xi-api-key", self.config.api_key.expose())
            .header("Accept", "audio/*")
            .json(&body))
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio> {
        if text.trim().is_empty() {
            return Err(TTSError::ProviderError("Refusing to synthesize empty text".to_string()));
        }

        let response = self
            .build_http_request(text)?
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "ElevenLabs synthesis failed");
            let message = format!("ElevenLabs API error ({status}): {body}");
            return Err(if status.as_u16() == 401 {
                TTSError::AuthenticationFailed(message)
            } else {
                TTSError::ProviderError(message)
            });
        }

        let data: Bytes = response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read audio: {e}")))?;
        if data.is_empty() {
            return Err(TTSError::EmptyAudio);
        }

        debug!(
            bytes = data.len(),
            format = %self.config.output_format,
            "ElevenLabs audio received"
        );
        Ok(SynthesizedAudio {
            data,
            encoding: self.config.encoding(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Secret;
    use crate::core::tts::AudioEncoding;

    fn config_for(server: &MockServer) -> ElevenLabsConfig {
        ElevenLabsConfig {
            api_key: Secret::new("xi-test"),
            base_url: server.uri(),
            voice_id: "voice123".to_string(),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_synthesize_sends_voice_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice123"))
            .and(query_param("output_format", "pcm_16000"))
            .and(header("xi-api-key", "xi-test"))
            .and(body_partial_json(serde_json::json!({
                "text": "Hello there",
                "model_id": "eleven_turbo_v2_5",
                "voice_settings": {"use_speaker_boost": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 640]))
            .expect(1)
            .mount(&server)
            .await;

        let tts = ElevenLabsTTS::new(config_for(&server)).unwrap();
        let audio = tts.synthesize("Hello there").await.unwrap();
        assert_eq!(audio.data.len(), 640);
        assert_eq!(audio.encoding, AudioEncoding::Pcm16 { sample_rate: 16000 });
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice123"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let tts = ElevenLabsTTS::new(config_for(&server)).unwrap();
        assert!(matches!(
            tts.synthesize("Hello").await,
            Err(TTSError::AuthenticationFailed(_))
        ));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad voice"))
            .mount(&server)
            .await;
        let tts = ElevenLabsTTS::new(config_for(&server)).unwrap();
        match tts.synthesize("Hello").await {
            Err(TTSError::ProviderError(message)) => assert!(message.contains("bad voice")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_body_and_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let tts = ElevenLabsTTS::new(config_for(&server)).unwrap();
        assert!(matches!(tts.synthesize("Hello").await, Err(TTSError::EmptyAudio)));
        assert!(matches!(
            tts.synthesize("   ").await,
            Err(TTSError::ProviderError(_))
        ));
    }
}
