//! Error types for call handling.

use thiserror::Error;

use crate::core::assistant::AssistantError;
use crate::core::stt::STTError;

/// Failures and non-fatal conditions raised while serving a call.
///
/// Only the collaborator variants can end a call early. The protocol variants
/// are logged and the call continues; `TransportClosed` is normal termination.
#[derive(Debug, Error)]
pub enum CallError {
    /// End of speech arrived while no audio was buffered.
    #[error("end of speech received with an empty audio buffer")]
    EmptyUtterance,

    /// Text frame that is not a control token.
    #[error("unrecognised text message: {0}")]
    UnknownMessage(String),

    /// Assistant selected a tool the gateway does not execute.
    #[error("unsupported tool selected: {0}")]
    UnsupportedTool(String),

    /// The outbound side of the connection is gone.
    #[error("call connection closed")]
    TransportClosed,

    #[error("transcription failed: {0}")]
    Transcription(#[from] STTError),

    #[error("assistant failed: {0}")]
    Assistant(#[from] AssistantError),
}

pub type CallResult<T> = Result<T, CallError>;

/// Failures building the shared application state at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("transcription engine unavailable: {0}")]
    Stt(#[from] STTError),

    #[error("assistant unavailable: {0}")]
    Assistant(#[from] AssistantError),
}
