use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   idle_timeout_seconds: 300
///   tls:
///     enabled: true
///     cert_path: "/etc/call-gateway/cert.pem"
///     key_path: "/etc/call-gateway/key.pem"
///
/// openai:
///   api_key: "sk-..."
///   base_url: "https://api.openai.com"
///
/// stt:
///   model: "whisper-1"
///   language: "en"
///
/// assistant:
///   model: "gpt-4o-mini"
///   instructions: "You are the front desk of a small hotel."
///   temperature: 0.7
///
/// tts:
///   model: "tts-1"
///   voice: "alloy"
///   speed: 1.0
///
/// call:
///   greeting_delay_ms: 500
///   play_greeting_tone: true
///   speak_first: true
///   opening_line: "Thanks for calling, how can I help?"
///   banner: "system: connected"
///   send_queue_capacity: 256
///
/// retry:
///   max_attempts: 3
///   initial_delay_ms: 250
///   max_delay_ms: 2000
///   backoff_multiplier: 2.0
///   request_timeout_seconds: 30
///
/// security:
///   max_websocket_connections: 500
///   max_connections_per_ip: 20
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub stt: Option<SttYaml>,
    pub assistant: Option<AssistantYaml>,
    pub tts: Option<TtsYaml>,
    pub call: Option<CallYaml>,
    pub retry: Option<RetryYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub idle_timeout_seconds: Option<u64>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SttYaml {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AssistantYaml {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub model: Option<String>,
    pub voice: Option<String>,
    pub speed: Option<f32>,
}

/// Call behaviour from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallYaml {
    pub greeting_delay_ms: Option<u64>,
    pub play_greeting_tone: Option<bool>,
    pub speak_first: Option<bool>,
    pub opening_line: Option<String>,
    /// Empty string disables the banner
    pub banner: Option<String>,
    pub send_queue_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RetryYaml {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f32>,
    /// Per-request bound for provider calls
    pub request_timeout_seconds: Option<u64>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Ok(serde_yaml::from_str(&contents)?)
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
  port: 8443
  tls:
    enabled: true
    cert_path: "/certs/cert.pem"
    key_path: "/certs/key.pem"
openai:
  api_key: "sk-yaml"
stt:
  language: "de"
assistant:
  temperature: 0.4
tts:
  voice: "shimmer"
call:
  speak_first: true
  banner: ""
retry:
  max_attempts: 4
security:
  max_connections_per_ip: 5
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.port, Some(8443));
        assert_eq!(server.tls.unwrap().enabled, Some(true));
        assert_eq!(config.openai.unwrap().api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(config.stt.unwrap().language.as_deref(), Some("de"));
        assert_eq!(config.assistant.unwrap().temperature, Some(0.4));
        assert_eq!(config.tts.unwrap().voice.as_deref(), Some("shimmer"));
        let call = config.call.unwrap();
        assert_eq!(call.speak_first, Some(true));
        assert_eq!(call.banner.as_deref(), Some(""));
        assert_eq!(config.retry.unwrap().max_attempts, Some(4));
        assert_eq!(config.security.unwrap().max_connections_per_ip, Some(5));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.call.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  host: \"localhost\"\n  port: 3000\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("localhost".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
