//! OpenAI-backed assistant.
//!
//! Replies come from the Chat Completions API with the built-in `endCall`
//! function exposed as a tool. Speech comes from the Audio Speech API in raw
//! `pcm` format (24kHz, 16-bit signed little-endian), which is converted to
//! the f32 samples the call socket carries.
//!
//! # API Reference
//!
//! - `POST https://api.openai.com/v1/chat/completions`
//! - `POST https://api.openai.com/v1/audio/speech`

mod client;
mod config;
mod messages;


pub use client::OpenAIAssistant;
pub use config::OpenAIAssistantConfig;
pub use messages::{ChatCompletionResponse, ChatMessage, ToolCall, pcm16_to_f32};
