//! Turn orchestration shared by every transport.
//!
//! A [`ConversationEngine`] pairs one dialogue policy with the speech
//! adapters. Transports hand it caller input and get back what to say. Nothing
//! in here returns an error: downstream failures have already been turned into
//! silence or a spoken fallback by the time a transport sees the result.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::core::dialogue::{DialoguePolicy, PolicyKind, TurnResult, prompts, retry_or_end};
use crate::core::session::CallSession;
use crate::core::stt::{FlushPolicy, SpeechToText};
use crate::core::tts::TextToSpeech;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Utterances recognised with less confidence are never shown to the policy
    pub confidence_floor: f32,
    pub max_retries: u32,
    pub flush: FlushPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            confidence_floor: crate::config::DEFAULT_CONFIDENCE_FLOOR,
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            flush: FlushPolicy::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            confidence_floor: config.dialogue.confidence_floor,
            max_retries: config.dialogue.max_retries,
            flush: FlushPolicy {
                min_bytes: config.audio.min_flush_bytes,
                min_interval: config.audio.min_flush_interval(),
            },
        }
    }
}

pub struct ConversationEngine {
    policy: Arc<dyn DialoguePolicy>,
    stt: Option<SpeechToText>,
    tts: Option<TextToSpeech>,
    settings: EngineSettings,
}

impl ConversationEngine {
    pub fn new(policy: Arc<dyn DialoguePolicy>, settings: EngineSettings) -> Self {
        Self {
            policy,
            stt: None,
            tts: None,
            settings,
        }
    }

    /// Attach the speech adapters needed by audio transports.
    pub fn with_speech(mut self, stt: SpeechToText, tts: TextToSpeech) -> Self {
        self.stt = Some(stt);
        self.tts = Some(tts);
        self
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn has_speech(&self) -> bool {
        self.stt.is_some() && self.tts.is_some()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Record and return the opening line, or `None` if the call was already
    /// greeted.
    pub async fn greet(&self, session: &CallSession) -> Option<String> {
        let mut conversation = session.conversation().await;
        let greeting = self.policy.greeting(session.context());
        if !conversation.record_greeting(&greeting) {
            debug!(call_id = %session.call_id(), "Call already greeted");
            return None;
        }
        info!(
            call_id = %session.call_id(),
            policy = %self.policy.kind(),
            "Greeting recorded"
        );
        Some(greeting)
    }

    /// Run one dialogue turn for a caller utterance.
    ///
    /// Returns `None` when the session is gone or the call has already ended.
    /// `confidence` is absent for transcripts that carry no score.
    pub async fn handle_utterance(
        &self,
        session: &CallSession,
        text: &str,
        confidence: Option<f32>,
    ) -> Option<TurnResult> {
        let mut conversation = session.conversation().await;
        if session.is_evicted() || conversation.is_ended() {
            debug!(call_id = %session.call_id(), "Ignoring utterance for finished call");
            return None;
        }

        let text = text.trim();
        let confidence = confidence.unwrap_or(1.0);

        if text.is_empty() || confidence < self.settings.confidence_floor {
            let result = retry_or_end(
                &mut conversation,
                self.settings.max_retries,
                prompts::REPEAT_REQUEST,
            );
            info!(
                call_id = %session.call_id(),
                confidence,
                attempts = conversation.retry_attempts,
                ends_call = result.should_end_call,
                "Utterance below confidence floor"
            );
            if result.should_end_call {
                conversation.mark_ended();
            }
            return Some(result);
        }

        let result = self
            .policy
            .next_turn(&mut conversation, session.context(), text, confidence)
            .await;
        conversation.record_exchange(text, &result.response_text, result.should_end_call);

        info!(
            call_id = %session.call_id(),
            turn = conversation.turn_count(),
            ends_call = result.should_end_call,
            reply = %result.response_text,
            "Dialogue turn complete"
        );
        Some(result)
    }

    /// Claim buffered caller audio if the flush policy allows it.
    pub fn begin_flush(&self, session: &CallSession) -> Option<Bytes> {
        session.try_begin_flush(&self.settings.flush)
    }

    /// Transcribe a claimed audio batch. Empty when nothing usable was heard.
    pub async fn transcribe(&self, session: &CallSession, batch: &[u8]) -> String {
        match &self.stt {
            Some(stt) => stt.flush(session.call_id(), batch).await,
            None => {
                warn!(call_id = %session.call_id(), "No transcriber configured, dropping audio");
                String::new()
            }
        }
    }

    /// Synthesize `text` as line-ready mu-law. `None` abandons playback.
    pub async fn synthesize(&self, session: &CallSession, text: &str) -> Option<Bytes> {
        let tts = match &self.tts {
            Some(tts) => tts,
            None => {
                warn!(call_id = %session.call_id(), "No synthesizer configured, skipping playback");
                return None;
            }
        };
        match tts.render(session.call_id(), text).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(
                    call_id = %session.call_id(),
                    error = %e,
                    "Synthesis failed, skipping playback"
                );
                None
            }
        }
    }
}
