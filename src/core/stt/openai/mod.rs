//! OpenAI Speech-to-Text (Whisper) API integration.
//!
//! Whisper is a REST batch API, which fits the call protocol directly: the
//! call session hands over one complete utterance at end-of-speech and the
//! client uploads it as a single WAV file.
//!
//! - [`config`]: Configuration types (`OpenAISTTConfig`, `OpenAISTTModel`)
//! - [`messages`]: Response types and WAV packaging
//! - [`client`]: The `OpenAISTT` client implementation
//!
//! # API Reference
//!
//! - API Endpoint: `POST https://api.openai.com/v1/audio/transcriptions`
//! - Max file size: 25MB
//! - Documentation: <https://platform.openai.com/docs/api-reference/audio/createTranscription>

mod client;
mod config;
mod messages;


// Re-export public types
pub use client::OpenAISTT;
pub use config::{OpenAISTTConfig, OpenAISTTModel};
pub use messages::{OpenAIError, OpenAIErrorResponse, TranscriptionResponse, wav};
