//! Turn-taking state machine for one call.
//!
//! The orchestrator consumes [`SessionEvent`]s from the call session, keeps the
//! conversation history and the call log, and drives the assistant. Assistant
//! work for a turn runs in a spawned task; the orchestrator keeps handling
//! events while it runs, so an interrupt is recorded as soon as it arrives and
//! the in-flight reply is still delivered afterwards.

use serde_json::json;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::core::assistant::{
    AssistantReply, AssistantResult, END_CALL_TOOL, SharedAssistant, ToolSelection,
};
use crate::core::call_log::{CallEvent, CallLog, CallLogEntry, History, Turn};
use crate::core::protocol::{
    ControlToken, HANGUP_MESSAGE, INTERRUPTED_MESSAGE, timing_line, transcript_line,
};
use crate::core::retry::{RetryConfig, with_retry};
use crate::core::session::{SessionEvent, SessionSender};
use crate::errors::CallError;

/// Status line sent when the assistant cannot produce a reply.
pub const ASSISTANT_FAILED_MESSAGE: &str = "system: assistant unavailable, ending call";

/// Receives the final call log. Invoked exactly once per call.
pub type CompletionCallback = Box<dyn FnOnce(Vec<CallLogEntry>) + Send + Sync + 'static>;

/// Lifecycle state of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Init,
    Ready,
    Listening,
    Responding,
    Ended,
}

/// Why a call ended; recorded in the `CALL_ENDED` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    CallerHangup,
    AssistantHangup,
    AssistantFailure,
}

impl EndReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EndReason::CallerHangup => "caller_hangup",
            EndReason::AssistantHangup => "assistant_hangup",
            EndReason::AssistantFailure => "assistant_failure",
        }
    }
}

/// Per-call behaviour.
#[derive(Debug, Clone)]
pub struct CallSettings {
    /// Pause between the greeting cue and `RDY`.
    pub greeting_delay: Duration,
    pub play_greeting_tone: bool,
    /// Whether the assistant opens the conversation.
    pub speak_first: bool,
    /// Fixed opening line; generated by the assistant when unset.
    pub opening_line: Option<String>,
    /// Status line sent when the call connects.
    pub banner: Option<String>,
    pub retry: RetryConfig,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            greeting_delay: Duration::from_millis(500),
            play_greeting_tone: true,
            speak_first: false,
            opening_line: None,
            banner: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Result of one piece of spawned assistant work.
enum TurnStage {
    /// The generated opening line.
    Opened(AssistantResult<String>),
    Replied {
        reply: AssistantResult<AssistantReply>,
        elapsed: Duration,
    },
    Spoken,
}

enum Next {
    Event(Option<SessionEvent>),
    Turn(Result<TurnStage, JoinError>),
}

pub struct ConversationOrchestrator {
    session_id: String,
    state: CallState,
    history: History,
    call_log: CallLog,
    assistant: SharedAssistant,
    sender: SessionSender,
    settings: CallSettings,
    completion: Option<CompletionCallback>,
    /// Utterances that arrived while a turn was in flight.
    queued: VecDeque<String>,
    in_flight: Option<JoinHandle<TurnStage>>,
    /// Tool of the reply currently being spoken.
    pending_tool: Option<ToolSelection>,
}

impl ConversationOrchestrator {
    pub fn new(
        session_id: impl Into<String>,
        assistant: SharedAssistant,
        sender: SessionSender,
        settings: CallSettings,
        completion: CompletionCallback,
    ) -> Self {
        let session_id = session_id.into();
        let mut call_log = CallLog::new();
        call_log.append(CallEvent::Init, Some(json!({ "session_id": session_id })));

        Self {
            session_id,
            state: CallState::Init,
            history: History::new(),
            call_log,
            assistant,
            sender,
            settings,
            completion: Some(completion),
            queued: VecDeque::new(),
            in_flight: None,
            pending_tool: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn call_log(&self) -> &CallLog {
        &self.call_log
    }

    /// Start the call with the configured greeting, then serve events until
    /// the call ends. Returns the orchestrator in its final state.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) -> Self {
        let delay = self.settings.greeting_delay;
        let play_tone = self.settings.play_greeting_tone;
        self.begin(delay, play_tone).await;

        while self.state != CallState::Ended {
            let next = tokio::select! {
                event = events.recv() => Next::Event(event),
                stage = wait_turn(&mut self.in_flight) => Next::Turn(stage),
            };

            match next {
                Next::Event(Some(event)) => self.handle_event(event).await,
                // Session dropped without a hangup event
                Next::Event(None) => self.on_hangup(),
                Next::Turn(stage) => {
                    self.in_flight = None;
                    self.handle_stage(stage).await;
                }
            }
        }
        self
    }

    /// `Init -> Ready`: optional greeting cue, wait `delay`, log `READY` and
    /// send `RDY`. When configured to speak first the call moves on to
    /// `Responding` while the opening line is produced and spoken.
    pub async fn begin(&mut self, delay: Duration, play_greeting_tone: bool) {
        if self.state != CallState::Init {
            return;
        }

        if let Some(banner) = self.settings.banner.clone() {
            self.send_meta(banner).await;
        }
        if play_greeting_tone && let Err(e) = self.sender.play_greeting().await {
            debug!(session_id = %self.session_id, error = %e, "Greeting tone not delivered");
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.state = CallState::Ready;
        self.call_log.append(CallEvent::Ready, None);
        self.send_token(ControlToken::Ready).await;
        info!(session_id = %self.session_id, "Call ready for input");

        if self.settings.speak_first {
            self.speak_opening_line().await;
        }
    }

    /// Runs as in-flight work like any other turn, so interrupts and hangups
    /// are handled while the line is generated and spoken.
    async fn speak_opening_line(&mut self) {
        self.state = CallState::Responding;

        if let Some(line) = self.settings.opening_line.clone() {
            return self.on_opening_line(Ok(line)).await;
        }

        let assistant = self.assistant.clone();
        let retry = self.settings.retry.clone();
        self.in_flight = Some(tokio::spawn(async move {
            TurnStage::Opened(with_retry(&retry, "opening_line", || assistant.opening_line()).await)
        }));
    }

    async fn on_opening_line(&mut self, line: AssistantResult<String>) {
        match line {
            Ok(line) => {
                self.record(Turn::assistant(line.clone()));
                self.send_meta(transcript_line("assistant", &line)).await;

                let assistant = self.assistant.clone();
                let sender = self.sender.clone();
                let retry = self.settings.retry.clone();
                self.in_flight = Some(tokio::spawn(async move {
                    speak(assistant, sender, retry, line).await;
                    TurnStage::Spoken
                }));
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "No opening line, waiting for caller");
                self.resume_listening().await;
            }
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Utterance(transcript) => self.on_utterance(transcript).await,
            SessionEvent::Interrupt => self.on_interrupt(),
            SessionEvent::Hangup => self.on_hangup(),
            SessionEvent::Ready | SessionEvent::ClearBuffer => {
                debug!(session_id = %self.session_id, ?event, "Ignoring server token sent by client");
            }
            SessionEvent::Unknown(text) => {
                debug!(session_id = %self.session_id, text = %text, "Client status line");
            }
        }
    }

    async fn on_utterance(&mut self, transcript: String) {
        match self.state {
            CallState::Ended => {
                warn!(session_id = %self.session_id, "Utterance after call ended, rejected");
            }
            CallState::Init | CallState::Responding => {
                debug!(
                    session_id = %self.session_id,
                    queued = self.queued.len() + 1,
                    "Turn in progress, utterance queued"
                );
                self.queued.push_back(transcript);
            }
            CallState::Ready | CallState::Listening => self.start_turn(transcript).await,
        }
    }

    /// `Ready/Listening -> Responding`.
    async fn start_turn(&mut self, transcript: String) {
        self.state = CallState::Responding;
        self.send_token(ControlToken::ClearBuffer).await;
        self.send_meta(transcript_line("user", &transcript)).await;
        self.record(Turn::user(transcript));

        let assistant = self.assistant.clone();
        let history = self.history.snapshot();
        let retry = self.settings.retry.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let started = Instant::now();
            let reply = with_retry(&retry, "response", || assistant.respond(&history)).await;
            TurnStage::Replied {
                reply,
                elapsed: started.elapsed(),
            }
        }));
    }

    async fn handle_stage(&mut self, stage: Result<TurnStage, JoinError>) {
        match stage {
            Ok(TurnStage::Opened(line)) => self.on_opening_line(line).await,
            Ok(TurnStage::Replied {
                reply: Ok(reply),
                elapsed,
            }) => self.on_reply(reply, elapsed).await,
            Ok(TurnStage::Replied { reply: Err(e), .. }) => self.fail_call(e.into()).await,
            Ok(TurnStage::Spoken) => {
                let tool = self.pending_tool.take();
                self.complete_turn(tool).await;
            }
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Assistant task failed");
                self.sender.end_call().await;
                self.finish(EndReason::AssistantFailure);
            }
        }
    }

    async fn on_reply(&mut self, reply: AssistantReply, elapsed: Duration) {
        self.send_meta(timing_line("response", elapsed.as_millis()))
            .await;

        let Some(content) = reply.content else {
            return self.complete_turn(reply.selected_tool).await;
        };

        self.record(Turn::assistant(content.clone()));
        self.send_meta(transcript_line("assistant", &content)).await;
        self.pending_tool = reply.selected_tool;

        let assistant = self.assistant.clone();
        let sender = self.sender.clone();
        let retry = self.settings.retry.clone();
        self.in_flight = Some(tokio::spawn(async move {
            speak(assistant, sender, retry, content).await;
            TurnStage::Spoken
        }));
    }

    /// Apply the turn's tool selection, then listen again or end the call.
    async fn complete_turn(&mut self, tool: Option<ToolSelection>) {
        match tool {
            Some(ToolSelection::EndCall) => {
                self.call_log.append(
                    CallEvent::ToolSelected,
                    Some(json!({ "tool": END_CALL_TOOL })),
                );
                info!(session_id = %self.session_id, "Assistant ended the call");
                self.send_meta(HANGUP_MESSAGE).await;
                self.sender.end_call().await;
                self.finish(EndReason::AssistantHangup);
            }
            Some(ToolSelection::Other(name)) => {
                warn!(
                    session_id = %self.session_id,
                    "{}",
                    CallError::UnsupportedTool(name.clone())
                );
                self.call_log
                    .append(CallEvent::ToolSelected, Some(json!({ "tool": name })));
                self.resume_listening().await;
            }
            None => self.resume_listening().await,
        }
    }

    async fn resume_listening(&mut self) {
        self.state = CallState::Listening;
        if let Some(next) = self.queued.pop_front() {
            self.start_turn(next).await;
        }
    }

    async fn fail_call(&mut self, error: CallError) {
        error!(session_id = %self.session_id, error = %error, "Ending call after assistant failure");
        self.send_meta(ASSISTANT_FAILED_MESSAGE).await;
        self.sender.end_call().await;
        self.finish(EndReason::AssistantFailure);
    }

    /// Interrupts never cancel in-flight assistant work.
    fn on_interrupt(&mut self) {
        if self.state == CallState::Ended {
            return;
        }
        debug!(session_id = %self.session_id, state = ?self.state, "Caller interrupted");
        self.record(Turn::user(INTERRUPTED_MESSAGE));
    }

    fn on_hangup(&mut self) {
        if let Some(turn) = self.in_flight.take() {
            turn.abort();
        }
        self.finish(EndReason::CallerHangup);
    }

    /// Move to `Ended`, append `CALL_ENDED` and deliver the call log. Only the
    /// first call has any effect.
    fn finish(&mut self, reason: EndReason) {
        if self.state == CallState::Ended {
            return;
        }
        self.state = CallState::Ended;
        self.queued.clear();
        self.call_log.append(
            CallEvent::CallEnded,
            Some(json!({ "reason": reason.as_str() })),
        );

        info!(
            session_id = %self.session_id,
            reason = reason.as_str(),
            turns = self.history.len(),
            log_entries = self.call_log.len(),
            "Call ended"
        );

        if let Some(completion) = self.completion.take() {
            completion(self.call_log.entries().to_vec());
        }
    }

    fn record(&mut self, turn: Turn) {
        self.call_log.append(
            CallEvent::Transcript,
            Some(json!({ "role": turn.role, "content": turn.content })),
        );
        self.history.push(turn);
    }

    async fn send_meta(&self, text: impl Into<String>) {
        if let Err(e) = self.sender.send_meta(text).await {
            debug!(session_id = %self.session_id, error = %e, "Status line not delivered");
        }
    }

    async fn send_token(&self, token: ControlToken) {
        if let Err(e) = self.sender.send_token(token).await {
            debug!(session_id = %self.session_id, token = %token, error = %e, "Token not delivered");
        }
    }
}

async fn wait_turn(turn: &mut Option<JoinHandle<TurnStage>>) -> Result<TurnStage, JoinError> {
    match turn {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Synthesize `text` and stream it to the caller. Failures skip the audio; the
/// reply text has already been recorded and echoed.
async fn speak(assistant: SharedAssistant, sender: SessionSender, retry: RetryConfig, text: String) {
    let started = Instant::now();
    match with_retry(&retry, "synthesis", || assistant.synthesize(&text)).await {
        Ok(samples) => {
            let _ = sender
                .send_meta(timing_line("synthesis", started.elapsed().as_millis()))
                .await;
            if let Err(e) = sender.send_audio(&samples).await {
                debug!(error = %e, "Reply audio not delivered");
            }
        }
        Err(e) => warn!(error = %e, "Speech synthesis failed, reply not spoken"),
    }
}
