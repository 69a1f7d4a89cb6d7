//! Configuration for the lead call gateway.
//!
//! Configuration comes from three places: a `.env` file (loaded in `main`),
//! process environment variables, and an optional YAML file.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: environment variable loading
//! - `yaml`: YAML configuration file loading and overlay
//! - `validation`: range checks on the merged result
//! - `secret`: zeroizing credential wrapper
//!
//! # Example
//! ```rust,no_run
//! use leadcall_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//!
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

mod env;
mod secret;
mod validation;
mod yaml;

pub use secret::Secret;
pub use yaml::YamlConfig;

use crate::core::dialogue::PolicyKind;
use crate::core::session::CallContext;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

pub const DEFAULT_BUSINESS_NAME: &str = "your business";
pub const DEFAULT_PRODUCT_CATEGORY: &str = "our services";
pub const DEFAULT_BRAND_NAME: &str = "the company";

pub const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.5;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MAX_TURNS: u32 = 12;
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 100;

pub const DEFAULT_WHISPER_MODEL: &str = "whisper-1";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_VOICE_ID: &str = "N2lVS1w4EtoT3dr4eOWO";
pub const DEFAULT_TTS_MODEL: &str = "eleven_turbo_v2_5";
pub const DEFAULT_OUTPUT_FORMAT: &str = "pcm_16000";
pub const DEFAULT_STABILITY: f32 = 0.65;
pub const DEFAULT_SIMILARITY_BOOST: f32 = 0.9;
pub const DEFAULT_STYLE: f32 = 0.35;
pub const DEFAULT_SAY_VOICE: &str = "Polly.Joanna";

pub const DEFAULT_MIN_FLUSH_BYTES: usize = 16_000;
pub const DEFAULT_MIN_FLUSH_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_FRAME_BYTES: usize = crate::core::audio::FRAME_BYTES;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 20;

pub const DEFAULT_HANGUP_DELAY_MS: u64 = 2_000;
pub const DEFAULT_END_GRACE_SECS: u64 = 60;
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 600;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_DOWNSTREAM_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {name}: {message}")]
    InvalidEnv { name: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Speech provider credentials and endpoints.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// Used for Whisper transcription and chat completions
    pub openai_api_key: Option<Secret>,
    pub openai_base_url: String,
    pub elevenlabs_api_key: Option<Secret>,
    pub elevenlabs_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            elevenlabs_api_key: None,
            elevenlabs_base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
        }
    }
}

/// Twilio REST credentials.
#[derive(Debug, Clone)]
pub struct TelephonyConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<Secret>,
    /// Caller id for outbound calls, in E.164 form
    pub from_number: Option<String>,
    pub api_base_url: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base_url: DEFAULT_TWILIO_API_BASE_URL.to_string(),
        }
    }
}

impl TelephonyConfig {
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some()
    }
}

/// Fallback campaign parameters when a call carries none.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    pub business_name: String,
    pub product_category: String,
    pub brand_name: String,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            business_name: DEFAULT_BUSINESS_NAME.to_string(),
            product_category: DEFAULT_PRODUCT_CATEGORY.to_string(),
            brand_name: DEFAULT_BRAND_NAME.to_string(),
        }
    }
}

impl CampaignConfig {
    pub fn context(&self) -> CallContext {
        CallContext {
            business_name: self.business_name.clone(),
            product_category: self.product_category.clone(),
            brand_name: self.brand_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Policy driving the audio media stream transport
    pub media_stream_policy: PolicyKind,
    /// Policy driving the text relay transport
    pub relay_policy: PolicyKind,
    pub confidence_floor: f32,
    pub max_retries: u32,
    pub max_turns: u32,
    pub chat_model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            media_stream_policy: PolicyKind::Generative,
            relay_policy: PolicyKind::Scripted,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            max_retries: DEFAULT_MAX_RETRIES,
            max_turns: DEFAULT_MAX_TURNS,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub whisper_model: String,
    pub language: String,
    pub voice_id: String,
    pub tts_model: String,
    /// ElevenLabs `output_format`, e.g. `pcm_16000` or `ulaw_8000`
    pub output_format: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub speaker_boost: bool,
    /// Voice used by `<Say>` in the webhook flow
    pub say_voice: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            whisper_model: DEFAULT_WHISPER_MODEL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            stability: DEFAULT_STABILITY,
            similarity_boost: DEFAULT_SIMILARITY_BOOST,
            style: DEFAULT_STYLE,
            speaker_boost: true,
            say_voice: DEFAULT_SAY_VOICE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub min_flush_bytes: usize,
    pub min_flush_interval_ms: u64,
    pub frame_bytes: usize,
    pub frame_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            min_flush_bytes: DEFAULT_MIN_FLUSH_BYTES,
            min_flush_interval_ms: DEFAULT_MIN_FLUSH_INTERVAL_MS,
            frame_bytes: DEFAULT_FRAME_BYTES,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl AudioConfig {
    pub fn min_flush_interval(&self) -> Duration {
        Duration::from_millis(self.min_flush_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone)]
pub struct CallsConfig {
    /// Delay between an end-flagged reply and closing the socket
    pub hangup_delay_ms: u64,
    /// How long a finished webhook conversation is kept around
    pub end_grace_secs: u64,
    pub session_max_age_secs: u64,
    pub sweep_interval_secs: u64,
    pub downstream_timeout_secs: u64,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            hangup_delay_ms: DEFAULT_HANGUP_DELAY_MS,
            end_grace_secs: DEFAULT_END_GRACE_SECS,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            downstream_timeout_secs: DEFAULT_DOWNSTREAM_TIMEOUT_SECS,
        }
    }
}

impl CallsConfig {
    pub fn hangup_delay(&self) -> Duration {
        Duration::from_millis(self.hangup_delay_ms)
    }

    pub fn end_grace(&self) -> Duration {
        Duration::from_secs(self.end_grace_secs)
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn downstream_timeout(&self) -> Duration {
        Duration::from_secs(self.downstream_timeout_secs)
    }
}

/// Server configuration
///
/// Everything needed to run the gateway:
/// - listener settings and the public URL the telephony provider calls back on
/// - speech provider and Twilio credentials
/// - campaign defaults, dialogue policy and audio pacing parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, e.g. `https://calls.example.com`.
    /// When unset, callback URLs are derived from the request `Host` header.
    pub public_url: Option<String>,

    pub providers: ProvidersConfig,
    pub telephony: TelephonyConfig,
    pub campaign: CampaignConfig,
    pub dialogue: DialogueConfig,
    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub calls: CallsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: None,
            providers: ProvidersConfig::default(),
            telephony: TelephonyConfig::default(),
            campaign: CampaignConfig::default(),
            dialogue: DialogueConfig::default(),
            speech: SpeechConfig::default(),
            audio: AudioConfig::default(),
            calls: CallsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file layered over the environment.
    ///
    /// Environment variables (including values from `.env`, loaded in `main`)
    /// provide the base; any value present in the YAML file overrides them.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let mut config = env::from_env()?;
        yaml_config.apply(&mut config);

        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public base URL without a trailing slash, if configured.
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    /// Get the API key for a provider.
    pub fn get_api_key(&self, provider: &str) -> Result<Secret, String> {
        match provider.to_lowercase().as_str() {
            "openai" => self
                .providers
                .openai_api_key
                .clone()
                .ok_or_else(|| "OpenAI API key not configured in server environment".to_string()),
            "elevenlabs" => self.providers.elevenlabs_api_key.clone().ok_or_else(|| {
                "ElevenLabs API key not configured in server environment".to_string()
            }),
            "twilio" => self
                .telephony
                .auth_token
                .clone()
                .ok_or_else(|| {
                    "Twilio auth token not configured in server environment".to_string()
                }),
            _ => Err(format!("Unsupported provider: {provider}")),
        }
    }
}
