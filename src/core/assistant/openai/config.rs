//! Configuration for the OpenAI assistant.

use std::time::Duration;

use super::super::base::AssistantError;

const DEFAULT_INSTRUCTIONS: &str = "You are a friendly voice assistant on a phone call. \
Keep answers short and conversational. When the caller says goodbye or asks to end \
the call, call the endCall tool.";

const DEFAULT_OPENING_PROMPT: &str =
    "The call has just connected. Greet the caller in one short sentence.";

/// OpenAI assistant configuration.
#[derive(Debug, Clone)]
pub struct OpenAIAssistantConfig {
    /// OpenAI API key
    pub api_key: String,
    /// API base URL (overridable for proxies and tests)
    pub base_url: String,
    /// Chat model used for replies
    pub model: String,
    /// System instructions prepended to every request
    pub instructions: String,
    /// Instruction used to generate the opening line
    pub opening_prompt: String,
    /// Sampling temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Speech model
    pub tts_model: String,
    /// Speech voice
    pub voice: String,
    /// Speaking speed (0.25 to 4.0)
    pub speed: f32,
    /// Upper bound for one chat or speech request
    pub request_timeout: Duration,
}

impl Default for OpenAIAssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            opening_prompt: DEFAULT_OPENING_PROMPT.to_string(),
            temperature: None,
            tts_model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl OpenAIAssistantConfig {
    pub fn chat_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    pub fn speech_url(&self) -> String {
        format!("{}/v1/audio/speech", self.base_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<(), AssistantError> {
        if self.api_key.is_empty() {
            return Err(AssistantError::AuthenticationFailed(
                "OpenAI API key is required".to_string(),
            ));
        }
        if self.model.is_empty() || self.tts_model.is_empty() || self.voice.is_empty() {
            return Err(AssistantError::InvalidConfiguration(
                "model, tts_model and voice must not be empty".to_string(),
            ));
        }
        if let Some(temp) = self.temperature
            && !(0.0..=2.0).contains(&temp)
        {
            return Err(AssistantError::InvalidConfiguration(format!(
                "Temperature must be between 0.0 and 2.0, got {temp}"
            )));
        }
        if !(0.25..=4.0).contains(&self.speed) {
            return Err(AssistantError::InvalidConfiguration(format!(
                "Speed must be between 0.25 and 4.0, got {}",
                self.speed
            )));
        }
        Ok(())
    }
}
