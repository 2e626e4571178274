//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `call` - Call WebSocket

pub mod api;
pub mod call;

pub use call::call_handler;
