use std::env;
use std::str::FromStr;

use super::{ConfigError, Secret, ServerConfig};

/// Read an optional, non-empty string variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn secret(name: &str) -> Option<Secret> {
    var(name).map(Secret::from)
}

/// Parse an optional variable, reporting which one was malformed.
fn parse<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv {
                name: name.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}

fn parse_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    match var(name).map(|v| v.to_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(v) => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            message: format!("{v:?} is not a boolean"),
        }),
        None => Ok(None),
    }
}

macro_rules! set_from {
    ($target:expr, $value:expr) => {
        if let Some(value) = $value {
            $target = value;
        }
    };
}

/// Build a configuration from defaults overlaid with environment variables.
pub(super) fn from_env() -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::default();

    set_from!(config.host, var("HOST"));
    set_from!(config.port, parse("PORT")?);
    config.public_url = var("PUBLIC_URL").or_else(|| var("PUBLIC_BASE_URL"));

    let providers = &mut config.providers;
    providers.openai_api_key = secret("OPENAI_API_KEY");
    set_from!(providers.openai_base_url, var("OPENAI_BASE_URL"));
    providers.elevenlabs_api_key = secret("ELEVENLABS_API_KEY");
    set_from!(providers.elevenlabs_base_url, var("ELEVENLABS_BASE_URL"));

    let telephony = &mut config.telephony;
    telephony.account_sid = var("TWILIO_ACCOUNT_SID");
    telephony.auth_token = secret("TWILIO_AUTH_TOKEN");
    telephony.from_number = var("TWILIO_PHONE_NUMBER");
    set_from!(telephony.api_base_url, var("TWILIO_API_BASE_URL"));

    let campaign = &mut config.campaign;
    set_from!(campaign.business_name, var("BUSINESS_NAME"));
    set_from!(campaign.product_category, var("PRODUCT_CATEGORY"));
    set_from!(campaign.brand_name, var("BRAND_NAME"));

    let dialogue = &mut config.dialogue;
    set_from!(dialogue.media_stream_policy, parse("MEDIA_STREAM_POLICY")?);
    set_from!(dialogue.relay_policy, parse("RELAY_POLICY")?);
    set_from!(dialogue.confidence_floor, parse("CONFIDENCE_FLOOR")?);
    set_from!(dialogue.max_retries, parse("MAX_RETRIES")?);
    set_from!(dialogue.max_turns, parse("MAX_TURNS")?);
    set_from!(dialogue.chat_model, var("CHAT_MODEL"));

    let speech = &mut config.speech;
    set_from!(speech.voice_id, var("ELEVENLABS_VOICE_ID"));
    set_from!(speech.tts_model, var("ELEVENLABS_MODEL"));
    set_from!(speech.output_format, var("ELEVENLABS_OUTPUT_FORMAT"));
    set_from!(speech.speaker_boost, parse_bool("ELEVENLABS_SPEAKER_BOOST")?);
    set_from!(speech.language, var("STT_LANGUAGE"));

    let calls = &mut config.calls;
    set_from!(calls.hangup_delay_ms, parse("HANGUP_DELAY_MS")?);
    set_from!(
        calls.downstream_timeout_secs,
        parse("DOWNSTREAM_TIMEOUT_SECS")?
    );
    set_from!(calls.session_max_age_secs, parse("SESSION_MAX_AGE_SECS")?);

    Ok(config)
}
