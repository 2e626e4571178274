//! Base trait and shared types for the conversational assistant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::call_log::Turn;
use crate::core::retry::Retryable;

/// Name of the built-in tool that ends the call.
pub const END_CALL_TOOL: &str = "endCall";

/// Errors that can occur while generating a reply or synthesizing speech.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssistantError {
    /// Invalid or missing configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Credentials were rejected by the provider
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Transport-level failure talking to the provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider returned an error response
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Retryable for AssistantError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            AssistantError::NetworkError(_) | AssistantError::ProviderError(_)
        )
    }
}

pub type AssistantResult<T> = Result<T, AssistantError>;

/// Tool chosen by the assistant for the current turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolSelection {
    /// The built-in hangup tool.
    EndCall,
    /// Any other tool; recorded but never executed.
    Other(String),
}

impl ToolSelection {
    pub fn from_name(name: &str) -> Self {
        if name == END_CALL_TOOL {
            ToolSelection::EndCall
        } else {
            ToolSelection::Other(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ToolSelection::EndCall => END_CALL_TOOL,
            ToolSelection::Other(name) => name,
        }
    }
}

impl fmt::Display for ToolSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The assistant's answer to one conversation turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantReply {
    /// Text to speak, if any.
    pub content: Option<String>,
    /// Tool selected for this turn, if any.
    pub selected_tool: Option<ToolSelection>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            selected_tool: None,
        }
    }

    pub fn tool(name: &str) -> Self {
        Self {
            content: None,
            selected_tool: Some(ToolSelection::from_name(name)),
        }
    }

    pub fn with_tool(mut self, name: &str) -> Self {
        self.selected_tool = Some(ToolSelection::from_name(name));
        self
    }
}

/// Conversational backend driving the call.
#[async_trait]
pub trait BaseAssistant: Send + Sync {
    /// Produce the next reply given the full conversation so far.
    async fn respond(&self, history: &[Turn]) -> AssistantResult<AssistantReply>;

    /// Synthesize mono 24 kHz f32 speech for `text`.
    async fn synthesize(&self, text: &str) -> AssistantResult<Vec<f32>>;

    /// Generate the line the assistant opens the call with.
    async fn opening_line(&self) -> AssistantResult<String> {
        let reply = self.respond(&[]).await?;
        reply
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AssistantError::InvalidResponse("empty opening line".to_string()))
    }

    /// Short provider identifier used in logs.
    fn provider_name(&self) -> &'static str;
}
