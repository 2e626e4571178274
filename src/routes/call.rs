//! Call WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::call::call_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the call WebSocket router
///
/// # Endpoint
///
/// `GET /call` - WebSocket upgrade; one connection is one call
///
/// # Protocol
///
/// Client sends:
/// - Binary frames of little-endian `f32` samples (24 kHz, mono)
/// - `EOS` when the caller stops speaking, `INT` when they talk over the
///   assistant, `RDY` and `CLR` as playback hints
///
/// Server sends:
/// - Binary audio frames of at most 1024 samples
/// - `RDY` when it is ready for the caller to speak, `CLR` to flush playback
/// - Status lines such as `user: ...`, `assistant: ...` and `time.response 812`
pub fn create_call_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/call", get(call_handler))
        .layer(TraceLayer::new_for_http())
}
