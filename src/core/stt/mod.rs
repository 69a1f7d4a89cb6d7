//! Speech-to-text: buffering caller audio and turning it into utterances.
//!
//! Caller audio arrives as 8 kHz mu-law frames. It is buffered per call in an
//! [`AudioAccumulator`] until the [`FlushPolicy`] releases a batch, then
//! [`SpeechToText::flush`] expands it to PCM, wraps it in WAV and asks the
//! [`Transcriber`] for text.

pub mod buffer;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};

pub use buffer::{AudioAccumulator, FlushPolicy};
pub use openai::{WhisperConfig, WhisperModel, WhisperTranscriber};

use crate::core::audio::{self, mulaw, wav};

#[derive(Debug, thiserror::Error)]
pub enum STTError {
    #[error("STT configuration error: {0}")]
    ConfigurationError(String),
    #[error("STT network error: {0}")]
    NetworkError(String),
    #[error("STT authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("STT provider error: {0}")]
    ProviderError(String),
    #[error("STT audio processing error: {0}")]
    AudioProcessingError(String),
    #[error("STT request timed out after {0:?}")]
    Timeout(Duration),
}

/// A batch transcription backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a complete WAV file.
    async fn transcribe(&self, wav: Bytes) -> Result<String, STTError>;

    fn provider_name(&self) -> &'static str;
}

/// Turns flushed mu-law batches into trimmed utterance text.
#[derive(Clone)]
pub struct SpeechToText {
    transcriber: Arc<dyn Transcriber>,
    timeout: Duration,
}

impl SpeechToText {
    pub fn new(transcriber: Arc<dyn Transcriber>, timeout: Duration) -> Self {
        Self {
            transcriber,
            timeout,
        }
    }

    /// Transcribe a batch of companded audio.
    ///
    /// Never fails: a provider error or timeout is logged and yields an empty
    /// string, which callers treat as "nothing was said".
    pub async fn flush(&self, call_id: &str, companded: &[u8]) -> String {
        if companded.is_empty() {
            return String::new();
        }

        let pcm = mulaw::decode(companded);
        let payload = Bytes::from(wav::wrap_pcm16(&pcm, audio::LINE_SAMPLE_RATE));
        debug!(
            call_id = %call_id,
            ulaw_bytes = companded.len(),
            wav_bytes = payload.len(),
            provider = self.transcriber.provider_name(),
            "Submitting audio for transcription"
        );

        let outcome = tokio::time::timeout(self.timeout, self.transcriber.transcribe(payload))
            .await
            .unwrap_or(Err(STTError::Timeout(self.timeout)));

        match outcome {
            Ok(text) => {
                let text = text.trim().to_string();
                info!(call_id = %call_id, chars = text.len(), "Transcription complete");
                text
            }
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Transcription failed, treating as silence");
                String::new()
            }
        }
    }
}
