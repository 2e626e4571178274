//! Request/response types for the OpenAI chat and speech endpoints.

use serde::Deserialize;
use serde_json::{Value, json};

use super::super::base::END_CALL_TOOL;
use crate::core::call_log::Turn;

/// Chat completion response (only the fields the gateway reads).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Assistant message of a completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Tool definitions offered to the model.
pub fn tool_definitions() -> Value {
    json!([{
        "type": "function",
        "function": {
            "name": END_CALL_TOOL,
            "description": "Hang up the phone call. Use when the conversation is over.",
            "parameters": { "type": "object", "properties": {} }
        }
    }])
}

/// Build the `messages` array: system instructions followed by the history.
pub fn build_messages(instructions: &str, history: &[Turn]) -> Vec<Value> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(json!({ "role": "system", "content": instructions }));
    for turn in history {
        messages.push(json!({ "role": turn.role.as_str(), "content": turn.content }));
    }
    messages
}

/// Convert 16-bit signed little-endian PCM to f32 samples.
///
/// A trailing odd byte is ignored.
pub fn pcm16_to_f32(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect()
}
