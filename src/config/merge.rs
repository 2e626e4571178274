use std::path::PathBuf;

use super::yaml::{TlsYaml, YamlConfig};
use super::{ApiKey, ConfigError, ServerConfig, TlsConfig};

/// Overlay every value present in the YAML file onto `config`.
pub fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) -> Result<(), ConfigError> {
    if let Some(server) = yaml.server {
        set(&mut config.host, server.host);
        set(&mut config.port, server.port);
        set(&mut config.idle_timeout_seconds, server.idle_timeout_seconds);
        if let Some(tls) = server.tls {
            config.tls = merge_tls(config.tls.take(), tls)?;
        }
    }

    if let Some(openai) = yaml.openai {
        if let Some(key) = openai.api_key {
            config.openai_api_key = Some(ApiKey::from(key)).filter(|k| !k.expose().is_empty());
        }
        set(&mut config.openai_base_url, openai.base_url);
    }

    if let Some(stt) = yaml.stt {
        set(&mut config.stt_provider, stt.provider);
        set(&mut config.stt_model, stt.model);
        if stt.language.is_some() {
            config.stt_language = stt.language.filter(|l| !l.is_empty());
        }
    }

    if let Some(assistant) = yaml.assistant {
        set(&mut config.assistant_provider, assistant.provider);
        set(&mut config.assistant_model, assistant.model);
        if assistant.instructions.is_some() {
            config.assistant_instructions = assistant.instructions;
        }
        if assistant.temperature.is_some() {
            config.assistant_temperature = assistant.temperature;
        }
    }

    if let Some(tts) = yaml.tts {
        set(&mut config.tts_model, tts.model);
        set(&mut config.tts_voice, tts.voice);
        set(&mut config.tts_speed, tts.speed);
    }

    if let Some(call) = yaml.call {
        set(&mut config.greeting_delay_ms, call.greeting_delay_ms);
        set(&mut config.play_greeting_tone, call.play_greeting_tone);
        set(&mut config.speak_first, call.speak_first);
        if call.opening_line.is_some() {
            config.opening_line = call.opening_line.filter(|l| !l.trim().is_empty());
        }
        if call.banner.is_some() {
            config.banner = call.banner.filter(|b| !b.is_empty());
        }
        set(&mut config.send_queue_capacity, call.send_queue_capacity);
    }

    if let Some(retry) = yaml.retry {
        set(&mut config.retry.max_attempts, retry.max_attempts);
        set(&mut config.retry.initial_delay_ms, retry.initial_delay_ms);
        set(&mut config.retry.max_delay_ms, retry.max_delay_ms);
        set(&mut config.retry.backoff_multiplier, retry.backoff_multiplier);
        set(&mut config.request_timeout_seconds, retry.request_timeout_seconds);
    }

    if let Some(security) = yaml.security {
        if security.max_websocket_connections.is_some() {
            config.max_websocket_connections = security.max_websocket_connections;
        }
        set(&mut config.max_connections_per_ip, security.max_connections_per_ip);
    }

    Ok(())
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn merge_tls(current: Option<TlsConfig>, yaml: TlsYaml) -> Result<Option<TlsConfig>, ConfigError> {
    if yaml.enabled == Some(false) {
        return Ok(None);
    }

    let cert = yaml
        .cert_path
        .map(PathBuf::from)
        .or_else(|| current.as_ref().map(|t| t.cert_path.clone()));
    let key = yaml
        .key_path
        .map(PathBuf::from)
        .or_else(|| current.as_ref().map(|t| t.key_path.clone()));

    match (cert, key) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path,
            key_path,
        })),
        (None, None) if yaml.enabled.is_none() => Ok(current),
        _ => Err(ConfigError::Invalid(
            "TLS requires both cert_path and key_path".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> YamlConfig {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_apply_yaml_overrides_only_present_values() {
        let mut config = ServerConfig {
            tts_voice: "echo".to_string(),
            ..Default::default()
        };
        apply_yaml(&mut config, yaml("tts:\n  model: \"tts-1-hd\"\n")).unwrap();

        assert_eq!(config.tts_model, "tts-1-hd");
        assert_eq!(config.tts_voice, "echo");
    }

    #[test]
    fn test_apply_yaml_tls() {
        let mut config = ServerConfig::default();
        apply_yaml(
            &mut config,
            yaml("server:\n  tls:\n    enabled: true\n    cert_path: c.pem\n    key_path: k.pem\n"),
        )
        .unwrap();
        assert_eq!(config.tls.as_ref().unwrap().cert_path, PathBuf::from("c.pem"));

        apply_yaml(&mut config, yaml("server:\n  tls:\n    enabled: false\n")).unwrap();
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_apply_yaml_tls_missing_key() {
        let mut config = ServerConfig::default();
        let result = apply_yaml(
            &mut config,
            yaml("server:\n  tls:\n    enabled: true\n    cert_path: c.pem\n"),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_apply_yaml_empty_banner_disables_it() {
        let mut config = ServerConfig::default();
        apply_yaml(&mut config, yaml("call:\n  banner: \"\"\n")).unwrap();
        assert!(config.banner.is_none());
    }
}
