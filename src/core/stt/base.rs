//! Base trait and shared types for speech-to-text engines.
//!
//! A call session owns exactly one engine instance. The engine receives one
//! contiguous utterance at a time and is torn down explicitly when the call
//! connection closes.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::core::protocol::SAMPLE_RATE;
use crate::core::retry::Retryable;

/// Errors that can occur during transcription.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum STTError {
    /// Invalid or missing engine configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Credentials were rejected by the provider
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Transport-level failure talking to the provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider returned an error response
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Audio could not be packaged for the provider
    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    /// The engine was used after `disconnect`
    #[error("Engine is closed")]
    Closed,
}

impl Retryable for STTError {
    fn is_retryable(&self) -> bool {
        matches!(self, STTError::NetworkError(_) | STTError::ProviderError(_))
    }
}

pub type STTResult<T> = Result<T, STTError>;

/// Default bound for a single provider request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration shared by all transcription engines.
#[derive(Debug, Clone)]
pub struct STTConfig {
    /// Provider name (e.g. "openai")
    pub provider: String,
    /// API key for the provider
    pub api_key: String,
    /// Optional ISO-639-1 language hint; empty means auto-detect
    pub language: String,
    /// Sample rate of the audio handed to `transcribe`
    pub sample_rate: u32,
    /// Provider model identifier
    pub model: String,
    /// Provider API base URL
    pub base_url: String,
    /// Upper bound for one transcription request
    pub request_timeout: Duration,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: String::new(),
            language: String::new(),
            sample_rate: SAMPLE_RATE,
            model: "whisper-1".to_string(),
            base_url: "https://api.openai.com".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Converts a contiguous buffer of mono f32 samples into text.
#[async_trait]
pub trait BaseSTT: Send + Sync {
    /// Transcribe one complete utterance.
    async fn transcribe(&self, samples: &[f32]) -> STTResult<String>;

    /// Release provider resources. Further `transcribe` calls fail with
    /// [`STTError::Closed`].
    async fn disconnect(&mut self) -> STTResult<()>;

    /// Short provider identifier used in logs.
    fn provider_name(&self) -> &'static str;
}

/// Boxed engine handed to a call session.
pub type BoxedSTT = Box<dyn BaseSTT>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(STTError::NetworkError("reset".into()).is_retryable());
        assert!(STTError::ProviderError("503".into()).is_retryable());
        assert!(!STTError::AuthenticationFailed("bad key".into()).is_retryable());
        assert!(!STTError::Closed.is_retryable());
    }

    #[test]
    fn test_default_config_matches_wire_rate() {
        assert_eq!(STTConfig::default().sample_rate, 24_000);
    }
}
