use url::Url;

use super::{ConfigError, ServerConfig};

/// Validate a fully merged configuration.
pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_base_url(&config.openai_base_url)?;
    validate_tls(config)?;

    if config.send_queue_capacity == 0 {
        return Err(invalid("send_queue_capacity", "must be greater than 0"));
    }
    if config.idle_timeout_seconds == 0 {
        return Err(invalid("idle_timeout_seconds", "must be greater than 0"));
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        return Err(invalid("retry.max_attempts", "must be at least 1"));
    }
    if retry.backoff_multiplier < 1.0 {
        return Err(invalid("retry.backoff_multiplier", "must be at least 1.0"));
    }
    if retry.initial_delay_ms > retry.max_delay_ms {
        return Err(invalid(
            "retry.initial_delay_ms",
            "must not exceed retry.max_delay_ms",
        ));
    }
    if config.request_timeout_seconds == 0 {
        return Err(invalid("request_timeout_seconds", "must be greater than 0"));
    }

    if !(0.25..=4.0).contains(&config.tts_speed) {
        return Err(invalid("tts_speed", "must be between 0.25 and 4.0"));
    }
    if let Some(temp) = config.assistant_temperature
        && !(0.0..=2.0).contains(&temp)
    {
        return Err(invalid("assistant_temperature", "must be between 0.0 and 2.0"));
    }

    if config.max_websocket_connections == Some(0) {
        return Err(invalid("max_websocket_connections", "must be greater than 0"));
    }
    if config.max_connections_per_ip == 0 {
        return Err(invalid("max_connections_per_ip", "must be greater than 0"));
    }

    Ok(())
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid("openai_base_url", &format!("'{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            "openai_base_url",
            &format!("unsupported scheme '{scheme}'"),
        )),
    }
}

fn validate_tls(config: &ServerConfig) -> Result<(), ConfigError> {
    let Some(tls) = &config.tls else {
        return Ok(());
    };
    for (name, path) in [("tls.cert_path", &tls.cert_path), ("tls.key_path", &tls.key_path)] {
        if !path.exists() {
            return Err(invalid(name, &format!("{} does not exist", path.display())));
        }
    }
    Ok(())
}

fn invalid(name: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        message: message.to_string(),
    }
}
