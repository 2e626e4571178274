//! Configuration module for the call gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use call_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::assistant::OpenAIAssistantConfig;
use crate::core::orchestrator::CallSettings;
use crate::core::retry::RetryConfig;
use crate::core::stt::STTConfig;

/// Default status line sent to the caller when a call connects.
pub const DEFAULT_BANNER: &str = "system: connected to call gateway";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the call gateway, including:
/// - Server settings (host, port, TLS, idle timeout)
/// - OpenAI credentials shared by transcription, assistant and speech
/// - Per-collaborator model settings
/// - Call behaviour (greeting, opening line, banner)
/// - Retry policy for external calls
/// - Connection limits
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Seconds without any inbound frame before a call socket is closed
    /// Default: 300
    pub idle_timeout_seconds: u64,

    // OpenAI settings
    /// OpenAI API key for transcription, chat and speech
    pub openai_api_key: Option<ApiKey>,
    /// OpenAI API base URL
    /// Default: https://api.openai.com
    pub openai_base_url: String,

    // Transcription
    pub stt_provider: String,
    pub stt_model: String,
    /// ISO-639-1 language hint (None = auto-detect)
    pub stt_language: Option<String>,

    // Assistant
    pub assistant_provider: String,
    pub assistant_model: String,
    /// System instructions (None = built-in phone assistant prompt)
    pub assistant_instructions: Option<String>,
    pub assistant_temperature: Option<f32>,

    // Speech synthesis
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,

    // Call behaviour
    /// Delay between the greeting tone and the ready signal
    /// Default: 500
    pub greeting_delay_ms: u64,
    pub play_greeting_tone: bool,
    /// Whether the assistant speaks first
    pub speak_first: bool,
    /// Fixed opening line (None = generated by the assistant)
    pub opening_line: Option<String>,
    /// Status line sent on connect (None = no banner)
    pub banner: Option<String>,
    /// Capacity of each call's outbound frame queue
    /// Default: 256
    pub send_queue_capacity: usize,

    /// Retry policy for transcription, response and synthesis calls
    pub retry: RetryConfig,
    /// Upper bound for each provider HTTP request, per attempt
    /// Default: 30
    pub request_timeout_seconds: u64,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            idle_timeout_seconds: 300,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            stt_provider: "openai".to_string(),
            stt_model: "whisper-1".to_string(),
            stt_language: None,
            assistant_provider: "openai".to_string(),
            assistant_model: "gpt-4o-mini".to_string(),
            assistant_instructions: None,
            assistant_temperature: None,
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            greeting_delay_ms: 500,
            play_greeting_tone: true,
            speak_first: false,
            opening_line: None,
            banner: Some(DEFAULT_BANNER.to_string()),
            send_queue_capacity: 256,
            retry: RetryConfig::default(),
            request_timeout_seconds: 30,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

/// Secret API key; wiped from memory on drop and redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.0.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults).
    ///
    /// The .env file is loaded in main.rs at application startup, so its values
    /// are visible here as regular environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let mut config = env::from_env()?;
        merge::apply_yaml(&mut config, yaml_config)?;

        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string ("host:port")
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    fn api_key(&self) -> String {
        self.openai_api_key
            .as_ref()
            .map(|key| key.expose().to_string())
            .unwrap_or_default()
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Transcription engine configuration for one call.
    pub fn stt_config(&self) -> STTConfig {
        STTConfig {
            provider: self.stt_provider.clone(),
            api_key: self.api_key(),
            language: self.stt_language.clone().unwrap_or_default(),
            model: self.stt_model.clone(),
            base_url: self.openai_base_url.clone(),
            request_timeout: self.request_timeout(),
            ..Default::default()
        }
    }

    /// Assistant configuration (chat + speech).
    pub fn assistant_config(&self) -> OpenAIAssistantConfig {
        let defaults = OpenAIAssistantConfig::default();
        OpenAIAssistantConfig {
            api_key: self.api_key(),
            base_url: self.openai_base_url.clone(),
            model: self.assistant_model.clone(),
            instructions: self
                .assistant_instructions
                .clone()
                .unwrap_or(defaults.instructions),
            temperature: self.assistant_temperature,
            tts_model: self.tts_model.clone(),
            voice: self.tts_voice.clone(),
            speed: self.tts_speed,
            opening_prompt: defaults.opening_prompt,
            request_timeout: self.request_timeout(),
        }
    }

    /// Per-call behaviour handed to each conversation.
    pub fn call_settings(&self) -> CallSettings {
        CallSettings {
            greeting_delay: Duration::from_millis(self.greeting_delay_ms),
            play_greeting_tone: self.play_greeting_tone,
            speak_first: self.speak_first,
            opening_line: self.opening_line.clone(),
            banner: self.banner.clone(),
            retry: self.retry.clone(),
        }
    }
}
