//! OpenAI STT (Whisper) client implementation.
//!
//! Each call to [`BaseSTT::transcribe`] packages the utterance as a 16-bit WAV
//! file and uploads it in one multipart request. The HTTP client is reused
//! across requests for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::super::base::{BaseSTT, STTConfig, STTError, STTResult};
use super::config::OpenAISTTConfig;
use super::messages::{OpenAIErrorResponse, TranscriptionResponse, wav};

/// OpenAI STT (Whisper) client implementing the BaseSTT trait.
pub struct OpenAISTT {
    /// Provider-specific configuration.
    pub(crate) config: OpenAISTTConfig,

    /// HTTP client for API requests (reused for connection pooling).
    http_client: Client,

    /// Set once `disconnect` has been called.
    closed: AtomicBool,
}

impl OpenAISTT {
    /// Create a client from the shared configuration.
    pub fn new(config: STTConfig) -> Result<Self, STTError> {
        Self::with_config(OpenAISTTConfig::from_base(config))
    }

    /// Create a client with OpenAI-specific configuration.
    pub fn with_config(config: OpenAISTTConfig) -> Result<Self, STTError> {
        config.validate()?;

        // A stalled upload must surface as an error rather than hang the call
        let http_client = Client::builder()
            .timeout(config.base.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                STTError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
            closed: AtomicBool::new(false),
        })
    }

    fn build_form(&self, samples: &[f32]) -> STTResult<Form> {
        let wav_data = wav::encode_pcm16(samples, self.config.base.sample_rate)
            .map_err(|e| STTError::AudioProcessingError(format!("WAV encoding failed: {e}")))?;

        if wav_data.len() > self.config.max_file_size_bytes {
            return Err(STTError::AudioProcessingError(format!(
                "Audio ({} bytes) exceeds maximum file size ({} bytes)",
                wav_data.len(),
                self.config.max_file_size_bytes
            )));
        }

        let file_part = Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| STTError::ConfigurationError(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.as_str().to_string())
            .text("response_format", "json".to_string());

        if !self.config.base.language.is_empty() {
            form = form.text("language", self.config.base.language.clone());
        }
        if let Some(temp) = self.config.temperature {
            form = form.text("temperature", temp.to_string());
        }
        if let Some(ref prompt) = self.config.prompt {
            form = form.text("prompt", prompt.clone());
        }
        Ok(form)
    }
}

#[async_trait]
impl BaseSTT for OpenAISTT {
    async fn transcribe(&self, samples: &[f32]) -> STTResult<String> {
        if self.closed.load(Ordering::Acquire) {
            return Err(STTError::Closed);
        }

        info!(
            samples = samples.len(),
            "Sending utterance to OpenAI transcription API"
        );

        let form = self.build_form(samples)?;
        let response = self
            .http_client
            .post(self.config.api_url())
            .header("Authorization", format!("Bearer {}", self.config.base.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| STTError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| STTError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let error_msg = match serde_json::from_str::<OpenAIErrorResponse>(&response_text) {
                Ok(error_response) => format!("OpenAI API error: {}", error_response.error),
                Err(_) => format!("OpenAI API error ({status}): {response_text}"),
            };
            return Err(if status.as_u16() == 401 {
                STTError::AuthenticationFailed(error_msg)
            } else {
                STTError::ProviderError(error_msg)
            });
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&response_text)
            .map_err(|e| STTError::ProviderError(format!("Invalid transcription response: {e}")))?;

        let transcript = parsed.text.trim().to_string();
        debug!(chars = transcript.len(), "Transcription complete");
        Ok(transcript)
    }

    async fn disconnect(&mut self) -> STTResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
