//! Shared application state.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::assistant::{SharedAssistant, create_assistant};
use crate::core::call_log::CallLogEntry;
use crate::core::stt::{BoxedSTT, STTResult, create_stt_provider};
use crate::core::tone::{SineToneGenerator, ToneGenerator};
use crate::errors::StartupError;

/// Builds one transcription engine per call.
pub type SttFactory = Arc<dyn Fn() -> STTResult<BoxedSTT> + Send + Sync>;

/// Receives the final call log of every call, keyed by session id.
pub type CallLogSink = Arc<dyn Fn(&str, Vec<CallLogEntry>) + Send + Sync>;

/// Why a new call connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    GlobalLimitReached,
    PerIpLimitReached,
}

/// State shared by every call: configuration, collaborators and connection
/// accounting. Calls never share mutable conversation state through it.
pub struct AppState {
    pub config: ServerConfig,
    pub assistant: SharedAssistant,
    pub tones: Arc<dyn ToneGenerator>,
    stt_factory: SttFactory,
    call_log_sink: CallLogSink,
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build the state with the providers named in `config`.
    ///
    /// Provider configuration is checked here so a missing API key fails at
    /// startup instead of on the first call.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, StartupError> {
        let stt_config = config.stt_config();
        let provider = config.stt_provider.clone();
        create_stt_provider(&provider, stt_config.clone())?;

        let assistant = create_assistant(&config.assistant_provider, config.assistant_config())?;
        info!(
            stt = %provider,
            assistant = assistant.provider_name(),
            "Providers configured"
        );

        let stt_factory: SttFactory =
            Arc::new(move || create_stt_provider(&provider, stt_config.clone()));

        Ok(Arc::new(Self::with_collaborators(
            config,
            stt_factory,
            assistant,
            Arc::new(SineToneGenerator::default()),
        )))
    }

    /// Build the state around explicit collaborators.
    pub fn with_collaborators(
        config: ServerConfig,
        stt_factory: SttFactory,
        assistant: SharedAssistant,
        tones: Arc<dyn ToneGenerator>,
    ) -> Self {
        Self {
            config,
            assistant,
            tones,
            stt_factory,
            call_log_sink: Arc::new(log_call_log),
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        }
    }

    /// Replace the default call log handling (structured log output).
    pub fn with_call_log_sink(mut self, sink: CallLogSink) -> Self {
        self.call_log_sink = sink;
        self
    }

    pub fn call_log_sink(&self) -> CallLogSink {
        self.call_log_sink.clone()
    }

    /// New transcription engine for one call.
    pub fn create_stt(&self) -> STTResult<BoxedSTT> {
        (self.stt_factory)()
    }

    /// Reserve a connection slot for `ip`, enforcing the global and per-IP limits.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let max_global = self.config.max_websocket_connections;
        self.ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| match max_global {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            })
            .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;

        let mut per_ip = self.ip_connections.entry(ip).or_insert(0);
        if *per_ip >= self.config.max_connections_per_ip {
            drop(per_ip);
            self.ws_connections.fetch_sub(1, Ordering::SeqCst);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *per_ip += 1;
        Ok(())
    }

    /// Release a slot taken by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_sub(1)
            });
        self.ip_connections.remove_if_mut(&ip, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }
}

/// Default sink: emit the call log as one structured log line.
fn log_call_log(session_id: &str, entries: Vec<CallLogEntry>) {
    match serde_json::to_string(&entries) {
        Ok(json) => info!(
            session_id = %session_id,
            entries = entries.len(),
            call_log = %json,
            "Call log"
        ),
        Err(e) => warn!(session_id = %session_id, error = %e, "Failed to serialize call log"),
    }
}
