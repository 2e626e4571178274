pub mod assistant;
pub mod call_log;
pub mod orchestrator;
pub mod protocol;
pub mod retry;
pub mod session;
pub mod stt;
pub mod tone;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use stt::{
    BaseSTT, BoxedSTT, OpenAISTT, OpenAISTTConfig, STTConfig, STTError, STTResult,
    create_stt_provider, get_supported_stt_providers,
};

pub use assistant::{
    AssistantError, AssistantReply, AssistantResult, BaseAssistant, OpenAIAssistant,
    OpenAIAssistantConfig, SharedAssistant, ToolSelection, create_assistant,
};

pub use call_log::{CallEvent, CallLog, CallLogEntry, History, Role, Turn};
pub use orchestrator::{CallSettings, CallState, CompletionCallback, ConversationOrchestrator};
pub use protocol::{AudioChunk, ClientMessage, ControlToken};
pub use retry::RetryConfig;
pub use session::{CallSession, MessageRoute, SessionEvent, SessionSender};
pub use tone::{SineToneGenerator, ToneGenerator};
