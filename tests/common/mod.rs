//! Scripted collaborators and a WebSocket client for call tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use call_gateway::core::protocol::{decode_samples, encode_samples};
use call_gateway::state::{CallLogSink, SttFactory};
use call_gateway::{
    AppState, AssistantReply, AssistantResult, BaseAssistant, BaseSTT, CallLogEntry, RetryConfig,
    STTResult, ServerConfig, ToneGenerator, Turn, create_app,
};

pub const SAMPLES_PER_REPLY: usize = 2500;

/// Transcription engine that returns scripted transcripts in order.
pub struct ScriptedSTT {
    transcripts: Arc<Mutex<VecDeque<String>>>,
    received: Arc<Mutex<Vec<usize>>>,
    /// Never answer, like a provider that stopped responding.
    stalled: bool,
}

#[async_trait]
impl BaseSTT for ScriptedSTT {
    async fn transcribe(&self, samples: &[f32]) -> STTResult<String> {
        self.received.lock().push(samples.len());
        if self.stalled {
            std::future::pending::<()>().await;
        }
        Ok(self.transcripts.lock().pop_front().unwrap_or_default())
    }

    async fn disconnect(&mut self) -> STTResult<()> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Assistant that answers from a script and speaks fixed-length audio.
pub struct ScriptedAssistant {
    replies: Mutex<VecDeque<AssistantReply>>,
    seen: Mutex<Vec<Vec<Turn>>>,
    latency: Duration,
}

impl ScriptedAssistant {
    pub fn new(replies: Vec<AssistantReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl BaseAssistant for ScriptedAssistant {
    async fn respond(&self, history: &[Turn]) -> AssistantResult<AssistantReply> {
        self.seen.lock().push(history.to_vec());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.replies.lock().pop_front().unwrap_or_default())
    }

    async fn synthesize(&self, _text: &str) -> AssistantResult<Vec<f32>> {
        Ok(vec![0.25; SAMPLES_PER_REPLY])
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub struct SilentTones;

impl ToneGenerator for SilentTones {
    fn greeting(&self) -> Vec<f32> {
        Vec::new()
    }

    fn departure(&self) -> Vec<f32> {
        Vec::new()
    }
}

/// Configuration with no greeting delay, banner or retries.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        greeting_delay_ms: 0,
        play_greeting_tone: false,
        banner: None,
        retry: RetryConfig::disabled(),
        ..Default::default()
    }
}

/// A running gateway plus handles on its scripted collaborators.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub assistant: Arc<ScriptedAssistant>,
    pub utterance_sizes: Arc<Mutex<Vec<usize>>>,
    pub call_logs: Arc<Mutex<Vec<(String, Vec<CallLogEntry>)>>>,
}

impl TestGateway {
    pub async fn start(
        config: ServerConfig,
        transcripts: Vec<&str>,
        assistant: ScriptedAssistant,
    ) -> Self {
        Self::launch(config, transcripts, false, assistant).await
    }

    /// A gateway whose transcription requests never complete.
    pub async fn with_stalled_transcription(config: ServerConfig) -> Self {
        Self::launch(config, vec![], true, ScriptedAssistant::new(vec![])).await
    }

    async fn launch(
        config: ServerConfig,
        transcripts: Vec<&str>,
        stalled: bool,
        assistant: ScriptedAssistant,
    ) -> Self {
        let transcripts: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(
            transcripts.into_iter().map(String::from).collect(),
        ));
        let utterance_sizes = Arc::new(Mutex::new(Vec::new()));

        let factory_transcripts = transcripts.clone();
        let factory_sizes = utterance_sizes.clone();
        let stt_factory: SttFactory = Arc::new(move || {
            Ok(Box::new(ScriptedSTT {
                transcripts: factory_transcripts.clone(),
                received: factory_sizes.clone(),
                stalled,
            }) as Box<dyn BaseSTT>)
        });

        let call_logs = Arc::new(Mutex::new(Vec::new()));
        let sink_logs = call_logs.clone();
        let sink: CallLogSink = Arc::new(move |session_id: &str, entries: Vec<CallLogEntry>| {
            sink_logs.lock().push((session_id.to_string(), entries));
        });

        let assistant = Arc::new(assistant);
        let state = Arc::new(
            AppState::with_collaborators(
                config,
                stt_factory,
                assistant.clone(),
                Arc::new(SilentTones),
            )
            .with_call_log_sink(sink),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_app(state.clone());
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            state,
            assistant,
            utterance_sizes,
            call_logs,
        }
    }

    pub async fn connect(&self) -> CallClient {
        let (ws, _) = connect_async(format!("ws://{}/call", self.addr))
            .await
            .expect("Failed to connect");
        CallClient { ws }
    }

    /// Wait until every call slot has been released.
    pub async fn wait_for_released_slots(&self) {
        timeout(Duration::from_secs(5), async {
            while self.state.ws_connection_count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connection slot not released");
    }

    /// Wait until `count` calls have delivered their call log.
    pub async fn wait_for_call_logs(&self, count: usize) -> Vec<(String, Vec<CallLogEntry>)> {
        timeout(Duration::from_secs(5), async {
            loop {
                if self.call_logs.lock().len() >= count {
                    return self.call_logs.lock().clone();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("call logs not delivered")
    }
}

/// One frame as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    /// Number of samples in a binary frame.
    Audio(usize),
    Closed,
}

impl Frame {
    pub fn is_text(&self, expected: &str) -> bool {
        matches!(self, Frame::Text(text) if text == expected)
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        matches!(self, Frame::Text(text) if text.starts_with(prefix))
    }
}

pub struct CallClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl CallClient {
    pub async fn send_audio(&mut self, samples: usize) {
        let frame = encode_samples(&vec![0.1f32; samples]);
        self.ws.send(Message::Binary(frame)).await.unwrap();
    }

    pub async fn send_text(&mut self, text: &str) {
        self.ws.send(Message::Text(text.into())).await.unwrap();
    }

    pub async fn hang_up(&mut self) {
        let _ = self.ws.close(None).await;
    }

    /// Next frame, or `Closed` once the server closes the socket.
    pub async fn next_frame(&mut self) -> Frame {
        loop {
            let msg = timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("timed out waiting for a frame");
            match msg {
                Some(Ok(Message::Text(text))) => return Frame::Text(text.to_string()),
                Some(Ok(Message::Binary(data))) => return Frame::Audio(decode_samples(&data).0.len()),
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return Frame::Closed,
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Read frames up to and including the first one matching `done`.
    pub async fn frames_until(&mut self, done: impl Fn(&Frame) -> bool) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            let frame = self.next_frame().await;
            let stop = done(&frame) || frame == Frame::Closed;
            frames.push(frame);
            if stop {
                return frames;
            }
        }
    }
}

/// Sizes of the audio frames among `frames`, in order.
pub fn audio_sizes(frames: &[Frame]) -> Vec<usize> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Audio(n) => Some(*n),
            _ => None,
        })
        .collect()
}
