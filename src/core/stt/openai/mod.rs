//! OpenAI Audio Transcription API (Whisper) integration.
//!
//! Whisper is a REST batch API: each flushed batch of caller audio is posted
//! as a WAV file in a multipart form and the transcript comes back in the
//! response body.
//!
//! - [`config`]: model, response format and endpoint settings
//! - [`messages`]: response and error payloads
//! - [`client`]: the [`WhisperTranscriber`] implementation of [`Transcriber`](super::Transcriber)

pub mod client;
pub mod config;
pub mod messages;

pub use client::WhisperTranscriber;
pub use config::{ResponseFormat, WhisperConfig, WhisperModel};
pub use messages::{OpenAIError, OpenAIErrorResponse, TranscriptionResponse, describe_error};

#[cfg(test)]
mod tests;
