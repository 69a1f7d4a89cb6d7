use super::{ConfigError, ServerConfig};

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn check_unit_range(name: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{name} must be within [0, 1], got {value}")));
    }
    Ok(())
}

/// Reject configurations that would make the engine misbehave at runtime.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(invalid("port must be non-zero"));
    }

    if let Some(url) = config.public_base_url() {
        let parsed = url::Url::parse(url)
            .map_err(|e| invalid(format!("public_url {url:?} is not a valid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "public_url must use http or https, got {}",
                parsed.scheme()
            )));
        }
    }

    let dialogue = &config.dialogue;
    check_unit_range("confidence_floor", dialogue.confidence_floor)?;
    if dialogue.max_turns == 0 {
        return Err(invalid("max_turns must be at least 1"));
    }
    if !(0.0..=2.0).contains(&dialogue.temperature) {
        return Err(invalid(format!(
            "temperature must be within [0, 2], got {}",
            dialogue.temperature
        )));
    }
    if dialogue.max_output_tokens == 0 {
        return Err(invalid("max_output_tokens must be at least 1"));
    }

    let speech = &config.speech;
    check_unit_range("stability", speech.stability)?;
    check_unit_range("similarity_boost", speech.similarity_boost)?;
    check_unit_range("style", speech.style)?;

    let audio = &config.audio;
    if audio.frame_bytes == 0 {
        return Err(invalid("frame_bytes must be non-zero"));
    }
    if audio.min_flush_interval_ms == 0 {
        return Err(invalid("min_flush_interval_ms must be non-zero"));
    }

    if config.calls.downstream_timeout_secs == 0 {
        return Err(invalid("downstream_timeout_secs must be non-zero"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_zero_port() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_confidence_floor_out_of_range() {
        let mut config = ServerConfig::default();
        config.dialogue.confidence_floor = -0.1;
        assert!(validate(&config).is_err());

        config.dialogue.confidence_floor = 1.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_frame_and_interval() {
        let mut config = ServerConfig::default();
        config.audio.frame_bytes = 0;
        assert!(validate(&config).is_err());

        let mut config = ServerConfig::default();
        config.audio.min_flush_interval_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_public_url() {
        let mut config = ServerConfig::default();
        config.public_url = Some("ftp://calls.example.com".to_string());
        assert!(validate(&config).is_err());

        config.public_url = Some("not a url".to_string());
        assert!(validate(&config).is_err());

        config.public_url = Some("https://calls.example.com".to_string());
        assert!(validate(&config).is_ok());
    }
}
