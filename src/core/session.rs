//! Frame-level protocol handling for one call connection.
//!
//! A call is split into two halves that talk over channels:
//!
//! - [`CallSession`] consumes inbound frames in arrival order, buffers audio
//!   until end of speech, runs transcription and emits [`SessionEvent`]s.
//! - [`SessionSender`] is the outbound half. It queues [`MessageRoute`]s on a
//!   bounded channel drained by the connection's writer task, so a slow client
//!   applies backpressure instead of growing an unbounded buffer.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::protocol::{AudioChunk, ClientMessage, ControlToken, chunk_frames, concat_chunks};
use crate::core::retry::{RetryConfig, with_retry};
use crate::core::stt::BoxedSTT;
use crate::core::tone::ToneGenerator;
use crate::errors::{CallError, CallResult};

/// Status line sent when an utterance could not be transcribed.
pub const TRANSCRIPTION_FAILED_MESSAGE: &str = "system: sorry, that was not understood, please repeat";

/// Outbound frame queued for the connection writer.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageRoute {
    /// Binary frame of encoded samples.
    Audio(Bytes),
    /// Text frame sent verbatim.
    Text(String),
    /// Close the connection after everything queued before it.
    Close,
}

/// Lifecycle events emitted by a [`CallSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A buffered utterance was transcribed.
    Utterance(String),
    Ready,
    Interrupt,
    ClearBuffer,
    /// Text that matched no control token.
    Unknown(String),
    /// The connection closed. Emitted at most once.
    Hangup,
}

/// Outbound half of a call. Cheap to clone.
#[derive(Clone)]
pub struct SessionSender {
    routes: mpsc::Sender<MessageRoute>,
    tones: Arc<dyn ToneGenerator>,
    ended: CancellationToken,
}

impl SessionSender {
    pub fn new(
        routes: mpsc::Sender<MessageRoute>,
        tones: Arc<dyn ToneGenerator>,
        ended: CancellationToken,
    ) -> Self {
        Self {
            routes,
            tones,
            ended,
        }
    }

    /// Send samples as sequential [`CHUNK_SAMPLES`](crate::core::protocol::CHUNK_SAMPLES)
    /// frames, preserving order.
    pub async fn send_audio(&self, samples: &[f32]) -> CallResult<()> {
        for frame in chunk_frames(samples) {
            self.push(MessageRoute::Audio(frame)).await?;
        }
        Ok(())
    }

    /// Send one text frame verbatim.
    pub async fn send_meta(&self, text: impl Into<String>) -> CallResult<()> {
        self.push(MessageRoute::Text(text.into())).await
    }

    pub async fn send_token(&self, token: ControlToken) -> CallResult<()> {
        self.send_meta(token.as_str()).await
    }

    pub async fn play_greeting(&self) -> CallResult<()> {
        self.send_audio(&self.tones.greeting()).await
    }

    /// Play the departure cue, close the connection and mark the call ended.
    ///
    /// Calling it again after the call ended does nothing.
    pub async fn end_call(&self) {
        if self.ended.is_cancelled() {
            return;
        }
        if let Err(e) = self.send_audio(&self.tones.departure()).await {
            debug!(error = %e, "Departure tone not delivered");
        }
        if self.push(MessageRoute::Close).await.is_err() {
            debug!("Connection already closed before hangup");
        }
        self.ended.cancel();
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_cancelled()
    }

    async fn push(&self, route: MessageRoute) -> CallResult<()> {
        self.routes
            .send(route)
            .await
            .map_err(|_| CallError::TransportClosed)
    }
}

/// Inbound half of a call: owns the utterance buffer and the STT engine.
pub struct CallSession {
    session_id: String,
    pending_audio: Vec<AudioChunk>,
    stt: Option<BoxedSTT>,
    events: mpsc::Sender<SessionEvent>,
    outbound: SessionSender,
    retry: RetryConfig,
    protocol_warnings: u64,
    hangup_emitted: bool,
}

impl CallSession {
    pub fn new(
        session_id: impl Into<String>,
        stt: BoxedSTT,
        events: mpsc::Sender<SessionEvent>,
        outbound: SessionSender,
        retry: RetryConfig,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            pending_audio: Vec::new(),
            stt: Some(stt),
            events,
            outbound,
            retry,
            protocol_warnings: 0,
            hangup_emitted: false,
        }
    }

    /// Number of samples currently buffered for the next utterance.
    pub fn pending_samples(&self) -> usize {
        self.pending_audio.iter().map(AudioChunk::len).sum()
    }

    /// Count of empty end-of-speech markers seen so far.
    pub fn protocol_warnings(&self) -> u64 {
        self.protocol_warnings
    }

    /// Whether frames are still being accepted.
    pub fn is_open(&self) -> bool {
        !self.hangup_emitted && !self.outbound.is_ended()
    }

    /// Handle one inbound frame.
    pub async fn on_frame(&mut self, message: ClientMessage) {
        if !self.is_open() {
            debug!(session_id = %self.session_id, "Ignoring frame after call ended");
            return;
        }

        match message {
            ClientMessage::Audio(chunk) => self.pending_audio.push(chunk),
            ClientMessage::Control(ControlToken::EndOfSpeech) => {
                if let Err(e) = self.flush_utterance().await {
                    warn!(session_id = %self.session_id, error = %e, "Utterance dropped");
                }
            }
            ClientMessage::Control(ControlToken::Interrupt) => {
                self.emit(SessionEvent::Interrupt).await
            }
            ClientMessage::Control(ControlToken::Ready) => self.emit(SessionEvent::Ready).await,
            ClientMessage::Control(ControlToken::ClearBuffer) => {
                self.emit(SessionEvent::ClearBuffer).await
            }
            ClientMessage::Unknown(text) => {
                debug!(
                    session_id = %self.session_id,
                    error = %CallError::UnknownMessage(text.clone()),
                    "Informational text from client"
                );
                self.emit(SessionEvent::Unknown(text)).await
            }
        }
    }

    /// Transcribe the buffered utterance and emit it.
    ///
    /// The buffer is taken before transcription starts, so it is empty again
    /// whatever the outcome.
    async fn flush_utterance(&mut self) -> CallResult<()> {
        if self.pending_audio.is_empty() {
            self.protocol_warnings += 1;
            warn!(
                session_id = %self.session_id,
                warnings = self.protocol_warnings,
                "{}",
                CallError::EmptyUtterance
            );
            return Ok(());
        }

        let chunks = std::mem::take(&mut self.pending_audio);
        let samples = concat_chunks(&chunks);
        let Some(stt) = self.stt.as_ref() else {
            return Err(CallError::TransportClosed);
        };

        debug!(
            session_id = %self.session_id,
            chunks = chunks.len(),
            samples = samples.len(),
            "Transcribing utterance"
        );

        match with_retry(&self.retry, "transcription", || stt.transcribe(&samples)).await {
            Ok(transcript) if !transcript.trim().is_empty() => {
                self.emit(SessionEvent::Utterance(transcript)).await;
                Ok(())
            }
            Ok(_) => {
                debug!(session_id = %self.session_id, "Empty transcript, waiting for more speech");
                self.outbound.send_token(ControlToken::Ready).await
            }
            Err(e) => {
                // Let the caller try again instead of leaving them in silence.
                let _ = self.outbound.send_meta(TRANSCRIPTION_FAILED_MESSAGE).await;
                let _ = self.outbound.send_token(ControlToken::Ready).await;
                Err(e.into())
            }
        }
    }

    /// Connection closed: emit `Hangup` once and release the STT engine.
    pub async fn close(&mut self) {
        if !self.hangup_emitted {
            self.hangup_emitted = true;
            self.emit(SessionEvent::Hangup).await;
        }

        if let Some(mut stt) = self.stt.take() {
            if let Err(e) = stt.disconnect().await {
                warn!(session_id = %self.session_id, error = %e, "Failed to release STT engine");
            }
            info!(session_id = %self.session_id, provider = stt.provider_name(), "STT engine released");
        }
        self.pending_audio.clear();
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            debug!(session_id = %self.session_id, "Conversation already finished, event dropped");
        }
    }
}
