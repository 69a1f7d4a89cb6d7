use serde::Deserialize;
use std::path::Path;

use super::{ConfigError, Secret, ServerConfig};
use crate::core::dialogue::PolicyKind;

/// Complete YAML configuration structure
///
/// Every field is optional so a file may carry only the values it wants to
/// override. Anything left out keeps its environment or default value.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///   public_url: "https://calls.example.com"
///
/// providers:
///   openai_api_key: "sk-..."
///   elevenlabs_api_key: "..."
///
/// telephony:
///   account_sid: "AC..."
///   auth_token: "..."
///   from_number: "+15550100000"
///
/// campaign:
///   business_name: "Acme"
///   product_category: "Widgets"
///   brand_name: "Acme Co"
///
/// dialogue:
///   media_stream_policy: generative
///   relay_policy: scripted
///   confidence_floor: 0.5
///   max_retries: 2
///
/// speech:
///   voice_id: "N2lVS1w4EtoT3dr4eOWO"
///   output_format: "pcm_16000"
///
/// audio:
///   min_flush_bytes: 16000
///   min_flush_interval_ms: 2000
///
/// calls:
///   hangup_delay_ms: 2000
///   downstream_timeout_secs: 15
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub telephony: Option<TelephonyYaml>,
    pub campaign: Option<CampaignYaml>,
    pub dialogue: Option<DialogueYaml>,
    pub speech: Option<SpeechYaml>,
    pub audio: Option<AudioYaml>,
    pub calls: Option<CallsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelephonyYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CampaignYaml {
    pub business_name: Option<String>,
    pub product_category: Option<String>,
    pub brand_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DialogueYaml {
    pub media_stream_policy: Option<PolicyKind>,
    pub relay_policy: Option<PolicyKind>,
    pub confidence_floor: Option<f32>,
    pub max_retries: Option<u32>,
    pub max_turns: Option<u32>,
    pub chat_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SpeechYaml {
    pub whisper_model: Option<String>,
    pub language: Option<String>,
    pub voice_id: Option<String>,
    pub tts_model: Option<String>,
    pub output_format: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub style: Option<f32>,
    pub speaker_boost: Option<bool>,
    pub say_voice: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub min_flush_bytes: Option<usize>,
    pub min_flush_interval_ms: Option<u64>,
    pub frame_bytes: Option<usize>,
    pub frame_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallsYaml {
    pub hangup_delay_ms: Option<u64>,
    pub end_grace_secs: Option<u64>,
    pub session_max_age_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
    pub downstream_timeout_secs: Option<u64>,
}

fn overlay<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn overlay_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl YamlConfig {
    /// Load a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse YAML text. An empty document yields the all-`None` config.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Overlay every value present in this file onto `config`.
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(server) = self.server {
            overlay(&mut config.host, server.host);
            overlay(&mut config.port, server.port);
            overlay_opt(&mut config.public_url, server.public_url);
        }

        if let Some(providers) = self.providers {
            let target = &mut config.providers;
            overlay_opt(&mut target.openai_api_key, providers.openai_api_key.map(Secret::from));
            overlay(&mut target.openai_base_url, providers.openai_base_url);
            overlay_opt(
                &mut target.elevenlabs_api_key,
                providers.elevenlabs_api_key.map(Secret::from),
            );
            overlay(&mut target.elevenlabs_base_url, providers.elevenlabs_base_url);
        }

        if let Some(telephony) = self.telephony {
            let target = &mut config.telephony;
            overlay_opt(&mut target.account_sid, telephony.account_sid);
            overlay_opt(&mut target.auth_token, telephony.auth_token.map(Secret::from));
            overlay_opt(&mut target.from_number, telephony.from_number);
            overlay(&mut target.api_base_url, telephony.api_base_url);
        }

        if let Some(campaign) = self.campaign {
            let target = &mut config.campaign;
            overlay(&mut target.business_name, campaign.business_name);
            overlay(&mut target.product_category, campaign.product_category);
            overlay(&mut target.brand_name, campaign.brand_name);
        }

        if let Some(dialogue) = self.dialogue {
            let target = &mut config.dialogue;
            overlay(&mut target.media_stream_policy, dialogue.media_stream_policy);
            overlay(&mut target.relay_policy, dialogue.relay_policy);
            overlay(&mut target.confidence_floor, dialogue.confidence_floor);
            overlay(&mut target.max_retries, dialogue.max_retries);
            overlay(&mut target.max_turns, dialogue.max_turns);
            overlay(&mut target.chat_model, dialogue.chat_model);
            overlay(&mut target.temperature, dialogue.temperature);
            overlay(&mut target.max_output_tokens, dialogue.max_output_tokens);
        }

        if let Some(speech) = self.speech {
            let target = &mut config.speech;
            overlay(&mut target.whisper_model, speech.whisper_model);
            overlay(&mut target.language, speech.language);
            overlay(&mut target.voice_id, speech.voice_id);
            overlay(&mut target.tts_model, speech.tts_model);
            overlay(&mut target.output_format, speech.output_format);
            overlay(&mut target.stability, speech.stability);
            overlay(&mut target.similarity_boost, speech.similarity_boost);
            overlay(&mut target.style, speech.style);
            overlay(&mut target.speaker_boost, speech.speaker_boost);
            overlay(&mut target.say_voice, speech.say_voice);
        }

        if let Some(audio) = self.audio {
            let target = &mut config.audio;
            overlay(&mut target.min_flush_bytes, audio.min_flush_bytes);
            overlay(&mut target.min_flush_interval_ms, audio.min_flush_interval_ms);
            overlay(&mut target.frame_bytes, audio.frame_bytes);
            overlay(&mut target.frame_interval_ms, audio.frame_interval_ms);
        }

        if let Some(calls) = self.calls {
            let target = &mut config.calls;
            overlay(&mut target.hangup_delay_ms, calls.hangup_delay_ms);
            overlay(&mut target.end_grace_secs, calls.end_grace_secs);
            overlay(&mut target.session_max_age_secs, calls.session_max_age_secs);
            overlay(&mut target.sweep_interval_secs, calls.sweep_interval_secs);
            overlay(&mut target.downstream_timeout_secs, calls.downstream_timeout_secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 3001
  public_url: "https://calls.example.com"
providers:
  openai_api_key: "sk-yaml"
  elevenlabs_api_key: "el-yaml"
telephony:
  account_sid: "AC123"
  auth_token: "token"
  from_number: "+15550100000"
campaign:
  business_name: "Acme"
  product_category: "Widgets"
  brand_name: "Acme Co"
dialogue:
  media_stream_policy: scripted
  relay_policy: generative
  confidence_floor: 0.45
speech:
  output_format: "ulaw_8000"
  speaker_boost: false
audio:
  min_flush_bytes: 8000
calls:
  hangup_delay_ms: 500
"#;
        let parsed = YamlConfig::parse(yaml).unwrap();
        let mut config = ServerConfig::default();
        parsed.apply(&mut config);

        assert_eq!(config.address(), "127.0.0.1:3001");
        assert_eq!(config.telephony.account_sid.as_deref(), Some("AC123"));
        assert!(config.telephony.is_configured());
        assert_eq!(config.campaign.brand_name, "Acme Co");
        assert_eq!(config.dialogue.media_stream_policy, PolicyKind::Scripted);
        assert_eq!(config.dialogue.relay_policy, PolicyKind::Generative);
        assert_eq!(config.dialogue.confidence_floor, 0.45);
        assert_eq!(config.speech.output_format, "ulaw_8000");
        assert!(!config.speech.speaker_boost);
        assert_eq!(config.audio.min_flush_bytes, 8000);
        assert_eq!(config.calls.hangup_delay_ms, 500);
    }

    #[test]
    fn test_yaml_config_partial_keeps_existing() {
        let mut config = ServerConfig::default();
        config.providers.openai_api_key = Some(Secret::new("sk-env"));

        YamlConfig::parse("server:\n  port: 7000\n")
            .unwrap()
            .apply(&mut config);

        assert_eq!(config.port, 7000);
        assert_eq!(config.host, super::super::DEFAULT_HOST);
        assert_eq!(
            config.providers.openai_api_key.as_ref().map(Secret::expose),
            Some("sk-env")
        );
    }

    #[test]
    fn test_yaml_config_empty() {
        let parsed = YamlConfig::parse("").unwrap();
        assert!(parsed.server.is_none());
        assert!(parsed.dialogue.is_none());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = YamlConfig::parse("dialogue:\n  relay_policy: freestyle\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_from_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = YamlConfig::from_file(&temp_dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        fs::write(&path, "server: [unterminated").unwrap();
        assert!(matches!(
            YamlConfig::from_file(&path),
            Err(ConfigError::Yaml(_))
        ));
    }
}
