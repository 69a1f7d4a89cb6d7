//! Text-to-speech: synthesizing replies and converting them for the phone line.
//!
//! The synthesis provider returns audio in whatever codec was requested. The
//! telephony leg only accepts 8 kHz mono mu-law, so every payload goes
//! through [`to_telephony_format`] before it is framed and sent. Payloads that
//! cannot be converted are rejected rather than sent as noise.

pub mod elevenlabs;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsTTS, VoiceSettings};

use crate::core::audio::{self, mulaw, resample, wav};

#[derive(Debug, thiserror::Error)]
pub enum TTSError {
    #[error("TTS configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("TTS network error: {0}")]
    NetworkError(String),
    #[error("TTS authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("TTS provider error: {0}")]
    ProviderError(String),
    #[error("unsupported audio format for telephony: {0}")]
    UnsupportedFormat(String),
    #[error("audio conversion failed: {0}")]
    AudioConversion(String),
    #[error("TTS provider returned no audio")]
    EmptyAudio,
    #[error("TTS request timed out after {0:?}")]
    Timeout(Duration),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Codec of a synthesized payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEncoding {
    /// 8 kHz mu-law, already line-ready
    Ulaw8000,
    /// Raw little-endian 16-bit mono PCM at the given rate
    Pcm16 { sample_rate: u32 },
    /// A RIFF/WAVE container
    Wav,
    /// Anything else (mp3, opus, ...), kept by name for error reporting
    Other(String),
}

impl AudioEncoding {
    /// Parse a provider output format name such as `ulaw_8000` or `pcm_16000`.
    pub fn from_format_name(name: &str) -> Self {
        let lowered = name.trim().to_lowercase();
        match lowered.split_once('_') {
            Some(("ulaw", "8000")) | Some(("mulaw", "8000")) => Self::Ulaw8000,
            Some(("pcm", rate)) => match rate.parse::<u32>() {
                Ok(sample_rate) if sample_rate > 0 => Self::Pcm16 { sample_rate },
                _ => Self::Other(lowered),
            },
            Some(("wav", _)) => Self::Wav,
            _ if lowered == "wav" => Self::Wav,
            _ => Self::Other(lowered),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Bytes,
    pub encoding: AudioEncoding,
}

/// A speech synthesis backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio>;

    fn provider_name(&self) -> &'static str;
}

/// Convert synthesized audio to 8 kHz mono mu-law.
pub fn to_telephony_format(audio: &SynthesizedAudio) -> TTSResult<Bytes> {
    if audio.data.is_empty() {
        return Err(TTSError::EmptyAudio);
    }

    // trust the container over the declared format
    let encoding = if audio.data.starts_with(b"RIFF") {
        AudioEncoding::Wav
    } else {
        audio.encoding.clone()
    };

    let ulaw = match encoding {
        AudioEncoding::Ulaw8000 => audio.data.clone(),
        AudioEncoding::Pcm16 { sample_rate } => {
            if audio.data.len() % 2 != 0 {
                return Err(TTSError::AudioConversion(format!(
                    "PCM payload has odd length {}",
                    audio.data.len()
                )));
            }
            let samples = resample::pcm16_samples(&audio.data);
            let line = resample::linear(&samples, sample_rate, audio::LINE_SAMPLE_RATE);
            Bytes::from(mulaw::encode_samples(&line))
        }
        AudioEncoding::Wav => {
            let decoded =
                wav::read_pcm16(&audio.data).map_err(|e| TTSError::AudioConversion(e.to_string()))?;
            let line =
                resample::linear(&decoded.samples, decoded.sample_rate, audio::LINE_SAMPLE_RATE);
            Bytes::from(mulaw::encode_samples(&line))
        }
        AudioEncoding::Other(name) => return Err(TTSError::UnsupportedFormat(name)),
    };

    if ulaw.is_empty() {
        return Err(TTSError::EmptyAudio);
    }
    Ok(ulaw)
}

/// Synthesizes reply text into line-ready mu-law audio.
#[derive(Clone)]
pub struct TextToSpeech {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeout: Duration,
}

impl TextToSpeech {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, timeout: Duration) -> Self {
        Self {
            synthesizer,
            timeout,
        }
    }

    /// Synthesize `text` and convert it for the phone line.
    pub async fn render(&self, call_id: &str, text: &str) -> TTSResult<Bytes> {
        debug!(
            call_id = %call_id,
            chars = text.len(),
            provider = self.synthesizer.provider_name(),
            "Synthesizing speech"
        );

        let synthesized = tokio::time::timeout(self.timeout, self.synthesizer.synthesize(text))
            .await
            .map_err(|_| TTSError::Timeout(self.timeout))??;

        let ulaw = to_telephony_format(&synthesized)?;
        info!(
            call_id = %call_id,
            provider_bytes = synthesized.data.len(),
            ulaw_bytes = ulaw.len(),
            frames = audio::frame_count(ulaw.len(), audio::FRAME_BYTES),
            "Speech synthesized"
        );
        Ok(ulaw)
    }
}
