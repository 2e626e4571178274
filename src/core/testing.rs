//! Scripted collaborators for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::core::assistant::{AssistantError, AssistantReply, AssistantResult, BaseAssistant};
use crate::core::call_log::Turn;
use crate::core::session::MessageRoute;
use crate::core::stt::{BaseSTT, STTError, STTResult};
use crate::core::tone::ToneGenerator;

/// Collect every route queued so far without waiting.
pub fn drain_routes(rx: &mut mpsc::Receiver<MessageRoute>) -> Vec<MessageRoute> {
    let mut routes = Vec::new();
    while let Ok(route) = rx.try_recv() {
        routes.push(route);
    }
    routes
}

/// Text frames among `routes`, in order.
pub fn text_routes(routes: &[MessageRoute]) -> Vec<String> {
    routes
        .iter()
        .filter_map(|r| match r {
            MessageRoute::Text(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Tones with no samples, so tests only see the audio they produce.
pub struct SilentTones;

impl ToneGenerator for SilentTones {
    fn greeting(&self) -> Vec<f32> {
        Vec::new()
    }

    fn departure(&self) -> Vec<f32> {
        Vec::new()
    }
}

pub struct MockSTT {
    result: STTResult<String>,
    received: Arc<Mutex<Vec<Vec<f32>>>>,
    disconnected: Arc<AtomicBool>,
}

impl MockSTT {
    pub fn replying(transcript: &str) -> Self {
        Self::with_result(Ok(transcript.to_string()))
    }

    pub fn failing(error: STTError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: STTResult<String>) -> Self {
        Self {
            result,
            received: Arc::new(Mutex::new(Vec::new())),
            disconnected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Buffers handed to `transcribe`, in call order.
    pub fn received(&self) -> Arc<Mutex<Vec<Vec<f32>>>> {
        self.received.clone()
    }

    pub fn disconnected(&self) -> Arc<AtomicBool> {
        self.disconnected.clone()
    }
}

#[async_trait]
impl BaseSTT for MockSTT {
    async fn transcribe(&self, samples: &[f32]) -> STTResult<String> {
        self.received.lock().push(samples.to_vec());
        self.result.clone()
    }

    async fn disconnect(&mut self) -> STTResult<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Assistant that answers from a script and synthesizes fixed-length audio.
pub struct MockAssistant {
    replies: Mutex<VecDeque<AssistantResult<AssistantReply>>>,
    seen: Mutex<Vec<Vec<Turn>>>,
    opening: Option<String>,
    samples_per_reply: usize,
    latency: Duration,
    synthesis_fails: bool,
}

impl MockAssistant {
    pub fn new(replies: Vec<AssistantReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            seen: Mutex::new(Vec::new()),
            opening: None,
            samples_per_reply: 2500,
            latency: Duration::ZERO,
            synthesis_fails: false,
        }
    }

    pub fn failing(error: AssistantError) -> Self {
        let assistant = Self::new(Vec::new());
        assistant.replies.lock().push_back(Err(error));
        assistant
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_opening(mut self, line: &str) -> Self {
        self.opening = Some(line.to_string());
        self
    }

    pub fn with_failing_synthesis(mut self) -> Self {
        self.synthesis_fails = true;
        self
    }

    pub fn samples_per_reply(&self) -> usize {
        self.samples_per_reply
    }

    /// Histories passed to `respond`, in call order.
    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl BaseAssistant for MockAssistant {
    async fn respond(&self, history: &[Turn]) -> AssistantResult<AssistantReply> {
        self.seen.lock().push(history.to_vec());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.replies.lock().pop_front();
        next.unwrap_or_else(|| Ok(AssistantReply::default()))
    }

    async fn synthesize(&self, _text: &str) -> AssistantResult<Vec<f32>> {
        if self.synthesis_fails {
            return Err(AssistantError::AuthenticationFailed("no speech".into()));
        }
        Ok(vec![0.25; self.samples_per_reply])
    }

    async fn opening_line(&self) -> AssistantResult<String> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.opening
            .clone()
            .ok_or_else(|| AssistantError::InvalidResponse("no opening".into()))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
