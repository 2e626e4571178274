mod base;
pub mod openai;

pub use base::{
    AssistantError, AssistantReply, AssistantResult, BaseAssistant, END_CALL_TOOL, ToolSelection,
};
pub use openai::{OpenAIAssistant, OpenAIAssistantConfig};

use std::sync::Arc;

/// Shared handle to an assistant; one instance serves every call.
pub type SharedAssistant = Arc<dyn BaseAssistant>;

/// Factory function to create an assistant by provider name.
pub fn create_assistant(
    provider: &str,
    config: OpenAIAssistantConfig,
) -> AssistantResult<SharedAssistant> {
    match provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIAssistant::new(config)?)),
        _ => Err(AssistantError::InvalidConfiguration(format!(
            "Unsupported assistant provider: {provider}. Supported providers: openai"
        ))),
    }
}
