//! ElevenLabs text-to-speech.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/v1/text-to-speech/{voice_id}?output_format=...`
//! - Auth: `xi-api-key` header
//! - Output: `ulaw_8000` is line-ready; `pcm_<rate>` is converted before sending

mod config;
mod provider;

pub use config::{ElevenLabsConfig, VoiceSettings};
pub use provider::ElevenLabsTTS;
