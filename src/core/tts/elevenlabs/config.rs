//! ElevenLabs request configuration.

use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::config::{DEFAULT_ELEVENLABS_BASE_URL, Secret, ServerConfig};
use crate::core::tts::AudioEncoding;

/// Voice tuning sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: crate::config::DEFAULT_STABILITY,
            similarity_boost: crate::config::DEFAULT_SIMILARITY_BOOST,
            style: crate::config::DEFAULT_STYLE,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: Secret,
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    /// Provider output format name, e.g. `pcm_16000` or `ulaw_8000`
    pub output_format: String,
    pub voice_settings: VoiceSettings,
    pub request_timeout: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(""),
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            voice_id: crate::config::DEFAULT_VOICE_ID.to_string(),
            model_id: crate::config::DEFAULT_TTS_MODEL.to_string(),
            output_format: crate::config::DEFAULT_OUTPUT_FORMAT.to_string(),
            voice_settings: VoiceSettings::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ElevenLabsConfig {
    /// Build from server configuration. Requires an ElevenLabs key.
    pub fn from_server_config(config: &ServerConfig) -> Result<Self, String> {
        let speech = &config.speech;
        Ok(Self {
            api_key: config.get_api_key("elevenlabs")?,
            base_url: config.providers.elevenlabs_base_url.clone(),
            voice_id: speech.voice_id.clone(),
            model_id: speech.tts_model.clone(),
            output_format: speech.output_format.clone(),
            voice_settings: VoiceSettings {
                stability: speech.stability,
                similarity_boost: speech.similarity_boost,
                style: speech.style,
                use_speaker_boost: speech.speaker_boost,
            },
            request_timeout: config.calls.downstream_timeout(),
        })
    }

    pub fn encoding(&self) -> AudioEncoding {
        AudioEncoding::from_format_name(&self.output_format)
    }

    /// Synthesis URL with the output format query parameter.
    pub fn api_url(&self) -> Result<Url, String> {
        let raw = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            self.voice_id
        );
        let mut url = Url::parse(&raw).map_err(|e| format!("Invalid ElevenLabs URL {raw}: {e}"))?;
        url.query_pairs_mut()
            .append_pair("output_format", &self.output_format);
        Ok(url)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("ElevenLabs API key is required".to_string());
        }
        if self.voice_id.trim().is_empty() {
            return Err("ElevenLabs voice ID is required".to_string());
        }
        if let AudioEncoding::Other(name) = self.encoding() {
            return Err(format!(
                "Output format {name} cannot be converted for telephony; use ulaw_8000 or pcm_<rate>"
            ));
        }
        self.api_url().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_carries_voice_and_format() {
        let config = ElevenLabsConfig {
            base_url: "https://api.elevenlabs.io/".to_string(),
            voice_id: "voice123".to_string(),
            output_format: "ulaw_8000".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.api_url().unwrap().as_str(),
            "https://api.elevenlabs.io/v1/text-to-speech/voice123?output_format=ulaw_8000"
        );
    }

    #[test]
    fn test_validate() {
        assert!(ElevenLabsConfig::default().validate().is_err());

        let config = ElevenLabsConfig {
            api_key: Secret::new("xi-key"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let mp3 = ElevenLabsConfig {
            output_format: "mp3_44100_128".to_string(),
            ..config.clone()
        };
        assert!(mp3.validate().unwrap_err().contains("mp3_44100_128"));

        let no_voice = ElevenLabsConfig {
            voice_id: " ".to_string(),
            ..config
        };
        assert!(no_voice.validate().is_err());
    }

    #[test]
    fn test_from_server_config_copies_voice_settings() {
        let mut server = ServerConfig::default();
        assert!(ElevenLabsConfig::from_server_config(&server).is_err());

        server.providers.elevenlabs_api_key = Some(Secret::new("xi-key"));
        server.speech.stability = 0.2;
        server.speech.speaker_boost = false;
        let config = ElevenLabsConfig::from_server_config(&server).unwrap();
        assert_eq!(config.voice_settings.stability, 0.2);
        assert!(!config.voice_settings.use_speaker_boost);
        assert_eq!(config.encoding(), AudioEncoding::Pcm16 { sample_rate: 16000 });
    }
}
