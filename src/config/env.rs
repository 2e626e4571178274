use std::path::PathBuf;

use super::utils::{env_present, env_var, parse_bool_env, parse_env};
use super::{ApiKey, ConfigError, ServerConfig, TlsConfig};

/// Build a configuration from environment variables over the defaults.
pub fn from_env() -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::default();

    // Server
    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_env("PORT")? {
        config.port = port;
    }
    if let Some(secs) = parse_env("CALL_IDLE_TIMEOUT_SECONDS")? {
        config.idle_timeout_seconds = secs;
    }
    config.tls = tls_from_env()?;

    // OpenAI
    config.openai_api_key = env_var("OPENAI_API_KEY").map(ApiKey::from);
    if let Some(url) = env_var("OPENAI_BASE_URL") {
        config.openai_base_url = url;
    }

    // Transcription
    if let Some(provider) = env_var("STT_PROVIDER") {
        config.stt_provider = provider;
    }
    if let Some(model) = env_var("STT_MODEL") {
        config.stt_model = model;
    }
    config.stt_language = env_var("STT_LANGUAGE");

    // Assistant
    if let Some(provider) = env_var("ASSISTANT_PROVIDER") {
        config.assistant_provider = provider;
    }
    if let Some(model) = env_var("ASSISTANT_MODEL") {
        config.assistant_model = model;
    }
    config.assistant_instructions = env_var("ASSISTANT_INSTRUCTIONS");
    config.assistant_temperature = parse_env("ASSISTANT_TEMPERATURE")?;

    // Speech
    if let Some(model) = env_var("TTS_MODEL") {
        config.tts_model = model;
    }
    if let Some(voice) = env_var("TTS_VOICE") {
        config.tts_voice = voice;
    }
    if let Some(speed) = parse_env("TTS_SPEED")? {
        config.tts_speed = speed;
    }

    // Call behaviour
    if let Some(delay) = parse_env("CALL_GREETING_DELAY_MS")? {
        config.greeting_delay_ms = delay;
    }
    if let Some(play) = parse_bool_env("CALL_PLAY_GREETING_TONE")? {
        config.play_greeting_tone = play;
    }
    if let Some(speak_first) = parse_bool_env("CALL_SPEAK_FIRST")? {
        config.speak_first = speak_first;
    }
    config.opening_line = env_var("CALL_OPENING_LINE");
    // An explicitly empty CALL_BANNER turns the banner off
    if env_present("CALL_BANNER") {
        config.banner = env_var("CALL_BANNER");
    }
    if let Some(capacity) = parse_env("CALL_SEND_QUEUE_CAPACITY")? {
        config.send_queue_capacity = capacity;
    }

    // Retry policy
    if let Some(attempts) = parse_env("RETRY_MAX_ATTEMPTS")? {
        config.retry.max_attempts = attempts;
    }
    if let Some(delay) = parse_env("RETRY_INITIAL_DELAY_MS")? {
        config.retry.initial_delay_ms = delay;
    }
    if let Some(delay) = parse_env("RETRY_MAX_DELAY_MS")? {
        config.retry.max_delay_ms = delay;
    }
    if let Some(multiplier) = parse_env("RETRY_BACKOFF_MULTIPLIER")? {
        config.retry.backoff_multiplier = multiplier;
    }
    if let Some(secs) = parse_env("REQUEST_TIMEOUT_SECONDS")? {
        config.request_timeout_seconds = secs;
    }

    // Connection limits
    config.max_websocket_connections = parse_env("MAX_WEBSOCKET_CONNECTIONS")?;
    if let Some(per_ip) = parse_env("MAX_CONNECTIONS_PER_IP")? {
        config.max_connections_per_ip = per_ip;
    }

    Ok(config)
}

fn tls_from_env() -> Result<Option<TlsConfig>, ConfigError> {
    let enabled = parse_bool_env("TLS_ENABLED")?.unwrap_or(false);
    if !enabled {
        return Ok(None);
    }

    match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        _ => Err(ConfigError::Invalid(
            "TLS_ENABLED requires TLS_CERT_PATH and TLS_KEY_PATH".to_string(),
        )),
    }
}
