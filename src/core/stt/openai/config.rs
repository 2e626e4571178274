//! Configuration types for OpenAI STT (Whisper) API.

use super::super::base::{STTConfig, STTError};
use serde::{Deserialize, Serialize};

/// Maximum upload size accepted by the transcription endpoint (25MB).
pub const OPENAI_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Supported OpenAI STT models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAISTTModel {
    /// Original Whisper model - good balance of speed and accuracy
    #[default]
    #[serde(rename = "whisper-1")]
    Whisper1,
    /// GPT-4o enhanced transcription - best accuracy
    #[serde(rename = "gpt-4o-transcribe")]
    Gpt4oTranscribe,
    /// GPT-4o mini transcription - faster, cost-effective
    #[serde(rename = "gpt-4o-mini-transcribe")]
    Gpt4oMiniTranscribe,
}

impl OpenAISTTModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whisper1 => "whisper-1",
            Self::Gpt4oTranscribe => "gpt-4o-transcribe",
            Self::Gpt4oMiniTranscribe => "gpt-4o-mini-transcribe",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "whisper-1" | "whisper1" | "whisper" => Self::Whisper1,
            "gpt-4o-transcribe" | "gpt4o-transcribe" => Self::Gpt4oTranscribe,
            "gpt-4o-mini-transcribe" | "gpt4o-mini-transcribe" => Self::Gpt4oMiniTranscribe,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for OpenAISTTModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// OpenAI-specific transcription configuration.
#[derive(Debug, Clone)]
pub struct OpenAISTTConfig {
    /// Base STT configuration (shared across all providers).
    pub base: STTConfig,

    /// OpenAI STT model to use.
    pub model: OpenAISTTModel,

    /// Temperature for sampling (0.0 to 1.0).
    pub temperature: Option<f32>,

    /// Optional text prompt to guide the transcription.
    pub prompt: Option<String>,

    /// Maximum WAV upload size in bytes.
    pub max_file_size_bytes: usize,
}

impl Default for OpenAISTTConfig {
    fn default() -> Self {
        Self {
            base: STTConfig::default(),
            model: OpenAISTTModel::default(),
            temperature: None,
            prompt: None,
            max_file_size_bytes: OPENAI_MAX_FILE_SIZE,
        }
    }
}

impl OpenAISTTConfig {
    /// Build from the shared configuration, parsing the model name.
    pub fn from_base(base: STTConfig) -> Self {
        let model = OpenAISTTModel::from_str_or_default(&base.model);
        Self {
            base,
            model,
            ..Default::default()
        }
    }

    /// Full URL of the transcription endpoint.
    pub fn api_url(&self) -> String {
        format!(
            "{}/v1/audio/transcriptions",
            self.base.base_url.trim_end_matches('/')
        )
    }

    pub fn validate(&self) -> Result<(), STTError> {
        if self.base.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "OpenAI API key is required".to_string(),
            ));
        }
        if self.base.sample_rate == 0 {
            return Err(STTError::ConfigurationError(
                "Sample rate must be greater than zero".to_string(),
            ));
        }
        if let Some(temp) = self.temperature
            && !(0.0..=1.0).contains(&temp)
        {
            return Err(STTError::ConfigurationError(format!(
                "Temperature must be between 0.0 and 1.0, got {temp}"
            )));
        }
        Ok(())
    }
}
