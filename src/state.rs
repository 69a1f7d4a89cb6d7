//! Shared application state handed to every route.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::core::dialogue::{DialoguePolicy, GenerativePolicy, PolicyKind, ScriptedPolicy};
use crate::core::engine::{ConversationEngine, EngineSettings};
use crate::core::llm::{ChatCompletion, ChatConfig, OpenAIChat};
use crate::core::session::SessionRegistry;
use crate::core::stt::{SpeechToText, WhisperConfig, WhisperTranscriber};
use crate::core::tts::{ElevenLabsConfig, ElevenLabsTTS, TextToSpeech};

/// Application state
///
/// Holds the session registry and one conversation engine per transport.
/// The webhook flow speaks through the telephony provider's own voice, so its
/// engine carries no speech adapters and always runs the scripted policy.
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<SessionRegistry>,
    pub media_stream: Arc<ConversationEngine>,
    pub relay: Arc<ConversationEngine>,
    pub webhook: Arc<ConversationEngine>,
}

impl AppState {
    /// Build state from configuration, constructing the real providers.
    ///
    /// Missing speech credentials are not fatal: the media stream transport
    /// then accepts calls but stays silent. A generative policy without a
    /// chat model key is a configuration error.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, ConfigError> {
        let speech = match build_speech(&config) {
            Ok(speech) => Some(speech),
            Err(e) => {
                warn!(
                    error = %e,
                    "Speech providers unavailable, media stream calls will be silent"
                );
                None
            }
        };

        let needs_llm = config.dialogue.media_stream_policy == PolicyKind::Generative
            || config.dialogue.relay_policy == PolicyKind::Generative;
        let llm: Option<Arc<dyn ChatCompletion>> = if needs_llm {
            let chat_config = ChatConfig::from_server_config(&config).map_err(|e| {
                ConfigError::Invalid(format!("generative policy requires a chat model: {e}"))
            })?;
            let chat = OpenAIChat::new(chat_config)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            Some(Arc::new(chat))
        } else {
            None
        };

        Self::assemble(config, speech, llm)
    }

    /// Build state from already constructed providers.
    pub fn assemble(
        config: ServerConfig,
        speech: Option<(SpeechToText, TextToSpeech)>,
        llm: Option<Arc<dyn ChatCompletion>>,
    ) -> Result<Arc<Self>, ConfigError> {
        let settings = EngineSettings::from_server_config(&config);

        let media_policy =
            build_policy(&config, config.dialogue.media_stream_policy, llm.as_ref())?;
        let mut media_stream = ConversationEngine::new(media_policy, settings);
        if let Some((stt, tts)) = speech {
            media_stream = media_stream.with_speech(stt, tts);
        }

        let relay_policy = build_policy(&config, config.dialogue.relay_policy, llm.as_ref())?;
        let relay = ConversationEngine::new(relay_policy, settings);

        let webhook = ConversationEngine::new(
            build_policy(&config, PolicyKind::Scripted, None)?,
            settings,
        );

        info!(
            media_stream_policy = %media_stream.policy_kind(),
            relay_policy = %relay.policy_kind(),
            speech = media_stream.has_speech(),
            "Application state ready"
        );

        Ok(Arc::new(Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            media_stream: Arc::new(media_stream),
            relay: Arc::new(relay),
            webhook: Arc::new(webhook),
        }))
    }
}

fn build_policy(
    config: &ServerConfig,
    kind: PolicyKind,
    llm: Option<&Arc<dyn ChatCompletion>>,
) -> Result<Arc<dyn DialoguePolicy>, ConfigError> {
    match kind {
        PolicyKind::Scripted => Ok(Arc::new(ScriptedPolicy::new(
            config.dialogue.confidence_floor,
            config.dialogue.max_retries,
        ))),
        PolicyKind::Generative => {
            let llm = llm.ok_or_else(|| {
                ConfigError::Invalid("generative policy requires a chat model".to_string())
            })?;
            Ok(Arc::new(GenerativePolicy::new(
                Arc::clone(llm),
                config.dialogue.max_turns,
                config.calls.downstream_timeout(),
            )))
        }
    }
}

fn build_speech(config: &ServerConfig) -> Result<(SpeechToText, TextToSpeech), String> {
    let timeout = config.calls.downstream_timeout();

    let whisper = WhisperConfig::from_server_config(config)?;
    let transcriber = WhisperTranscriber::new(whisper).map_err(|e| e.to_string())?;

    let elevenlabs = ElevenLabsConfig::from_server_config(config)?;
    let synthesizer = ElevenLabsTTS::new(elevenlabs).map_err(|e| e.to_string())?;

    Ok((
        SpeechToText::new(Arc::new(transcriber), timeout),
        TextToSpeech::new(Arc::new(synthesizer), timeout),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    #[tokio::test]
    async fn test_generative_without_key_is_rejected() {
        let config = ServerConfig::default();
        assert_eq!(config.dialogue.media_stream_policy, PolicyKind::Generative);
        assert!(matches!(
            AppState::new(config).await,
            Err(ConfigError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_scripted_only_needs_no_credentials() {
        let mut config = ServerConfig::default();
        config.dialogue.media_stream_policy = PolicyKind::Scripted;

        let state = AppState::new(config).await.unwrap();
        assert_eq!(state.media_stream.policy_kind(), PolicyKind::Scripted);
        assert_eq!(state.relay.policy_kind(), PolicyKind::Scripted);
        assert_eq!(state.webhook.policy_kind(), PolicyKind::Scripted);
        assert!(!state.media_stream.has_speech());
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_full_provider_set() {
        let mut config = ServerConfig::default();
        config.providers.openai_api_key = Some(Secret::new("sk-test"));
        config.providers.elevenlabs_api_key = Some(Secret::new("el-test"));
        config.dialogue.relay_policy = PolicyKind::Generative;

        let state = AppState::new(config).await.unwrap();
        assert_eq!(state.media_stream.policy_kind(), PolicyKind::Generative);
        assert_eq!(state.relay.policy_kind(), PolicyKind::Generative);
        assert_eq!(state.webhook.policy_kind(), PolicyKind::Scripted);
        assert!(state.media_stream.has_speech());
    }
}
