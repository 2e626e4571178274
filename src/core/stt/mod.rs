mod base;
pub mod openai;

// Re-export public types and traits
pub use base::{BaseSTT, BoxedSTT, STTConfig, STTError, STTResult};

// Re-export OpenAI implementation
pub use openai::{OpenAISTT, OpenAISTTConfig, OpenAISTTModel};

/// Factory function to create a transcription engine by provider name.
///
/// # Examples
/// ```rust,no_run
/// use call_gateway::core::stt::{create_stt_provider, STTConfig};
///
/// let config = STTConfig {
///     api_key: "sk-...".to_string(),
///     ..Default::default()
/// };
/// let stt = create_stt_provider("openai", config).expect("valid config");
/// assert_eq!(stt.provider_name(), "openai");
/// ```
pub fn create_stt_provider(provider: &str, config: STTConfig) -> STTResult<BoxedSTT> {
    match provider.to_lowercase().as_str() {
        "openai" | "whisper" => Ok(Box::new(OpenAISTT::new(config)?)),
        _ => Err(STTError::ConfigurationError(format!(
            "Unsupported STT provider: {provider}. Supported providers: openai"
        ))),
    }
}

/// Get a list of all supported STT providers
pub fn get_supported_stt_providers() -> Vec<&'static str> {
    vec!["openai"]
}
