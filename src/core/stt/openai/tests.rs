//! Tests for the Whisper transcriber against a mock API server.

use super::*;
use crate::config::Secret;
use crate::core::audio::wav;
use crate::core::stt::{STTError, Transcriber};
use bytes::Bytes;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests whose raw body contains a byte pattern. Multipart bodies
/// carry binary audio, so string matchers cannot be used.
struct BodyContains(&'static [u8]);

impl Match for BodyContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .body
            .windows(self.0.len())
            .any(|window| window == self.0)
    }
}

fn config_for(server: &MockServer) -> WhisperConfig {
    WhisperConfig {
        api_key: Secret::new("sk-test"),
        base_url: format!("{}/v1", server.uri()),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn silence_wav() -> Bytes {
    Bytes::from(wav::wrap_pcm16(&[0u8; 320], 8000))
}

mod config_tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!(WhisperModel::Whisper1.as_str(), "whisper-1");
        assert_eq!(
            WhisperModel::from_str_or_default("WHISPER-1"),
            WhisperModel::Whisper1
        );
        assert_eq!(
            WhisperModel::from_str_or_default("gpt-4o-mini-transcribe"),
            WhisperModel::Gpt4oMiniTranscribe
        );
        assert_eq!(
            WhisperModel::from_str_or_default("invalid"),
            WhisperModel::Whisper1
        );
    }

    #[test]
    fn test_api_url_handles_trailing_slash() {
        let config = WhisperConfig {
            base_url: "https://api.openai.com/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.api_url(),
            "https://api.openai.com/v1/audio/transcriptions"
        );
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let result = WhisperTranscriber::new(WhisperConfig::default());
        assert!(matches!(result, Err(STTError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_server_config() {
        let mut server = crate::config::ServerConfig::default();
        assert!(WhisperConfig::from_server_config(&server).is_err());

        server.providers.openai_api_key = Some(Secret::new("sk-live"));
        server.speech.language = "es".to_string();
        let config = WhisperConfig::from_server_config(&server).unwrap();
        assert_eq!(config.language, "es");
        assert_eq!(config.model, WhisperModel::Whisper1);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }
}

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_transcribe_posts_multipart_wav() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(BodyContains(b"whisper-1"))
            .and(BodyContains(b"filename=\"audio.wav\""))
            .and(BodyContains(b"name=\"language\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"text": "yes I am interested"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transcriber = WhisperTranscriber::new(config_for(&server)).unwrap();
        let text = transcriber.transcribe(silence_wav()).await.unwrap();
        assert_eq!(text, "yes I am interested");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#,
            ))
            .mount(&server)
            .await;

        let transcriber = WhisperTranscriber::new(config_for(&server)).unwrap();
        let err = transcriber.transcribe(silence_wav()).await.unwrap_err();
        match err {
            STTError::AuthenticationFailed(message) => {
                assert!(message.contains("Incorrect API key provided"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_maps_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let transcriber = WhisperTranscriber::new(config_for(&server)).unwrap();
        let err = transcriber.transcribe(silence_wav()).await.unwrap_err();
        assert!(matches!(err, STTError::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let transcriber = WhisperTranscriber::new(config_for(&server)).unwrap();
        let err = transcriber.transcribe(silence_wav()).await.unwrap_err();
        assert!(matches!(err, STTError::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_text_format_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(BodyContains(b"name=\"response_format\""))
            .respond_with(ResponseTemplate::new(200).set_body_string("how much does it cost\n"))
            .mount(&server)
            .await;

        let config = WhisperConfig {
            response_format: ResponseFormat::Text,
            ..config_for(&server)
        };
        let transcriber = WhisperTranscriber::new(config).unwrap();
        let text = transcriber.transcribe(silence_wav()).await.unwrap();
        assert_eq!(text, "how much does it cost\n");
    }
}
