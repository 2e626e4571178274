//! Call WebSocket handler
//!
//! One WebSocket connection is one phone call. Inbound frames are classified
//! and fed to a [`CallSession`]; the session turns them into events for a
//! [`ConversationOrchestrator`] running on its own task. Everything sent back
//! to the caller goes through a single bounded route channel drained by a
//! sender task, so audio and text keep the order they were produced in.

use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tokio::{select, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::orchestrator::CompletionCallback;
use crate::core::protocol::ClientMessage;
use crate::core::{
    CallSession, ConversationOrchestrator, MessageRoute, SessionEvent, SessionSender,
};
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Session events are small and consumed quickly.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long cleanup waits for the conversation task to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Call WebSocket handler
///
/// Upgrades the HTTP connection to a call. The connection slot reserved by
/// the connection limit middleware is released when the call ends.
pub async fn call_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let client_ip = client_ip.map(|Extension(ip)| ip);
    debug!(client_ip = ?client_ip.map(|c| c.0), "Call WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            handle_call_socket(socket, state.clone()).await;
            if let Some(ClientIp(ip)) = client_ip {
                state.release_connection(ip);
            }
        })
}

/// Serve one call until either side hangs up.
async fn handle_call_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, "Call connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let stt = match state.create_stt() {
        Ok(stt) => stt,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to create transcription engine");
            let _ = ws_sender
                .send(Message::Text("system: transcription unavailable".into()))
                .await;
            let _ = ws_sender.send(Message::Close(None)).await;
            return;
        }
    };

    let (route_tx, mut route_rx) = mpsc::channel::<MessageRoute>(state.config.send_queue_capacity);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(EVENT_CHANNEL_CAPACITY);
    let ended = CancellationToken::new();
    let outbound = SessionSender::new(route_tx, state.tones.clone(), ended.clone());

    // Sender task for outgoing frames
    let sender_session = session_id.clone();
    let mut sender_task = tokio::spawn(async move {
        while let Some(route) = route_rx.recv().await {
            let should_close = matches!(route, MessageRoute::Close);

            let result = match route {
                MessageRoute::Audio(data) => ws_sender.send(Message::Binary(data)).await,
                MessageRoute::Text(text) => ws_sender.send(Message::Text(text.into())).await,
                MessageRoute::Close => {
                    debug!(session_id = %sender_session, "Closing call WebSocket");
                    ws_sender.send(Message::Close(None)).await
                }
            };

            if let Err(e) = result {
                debug!(session_id = %sender_session, error = %e, "Failed to send WebSocket frame");
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let sink = state.call_log_sink();
    let completion_session = session_id.clone();
    let completion: CompletionCallback = Box::new(move |entries| sink(&completion_session, entries));

    let orchestrator = ConversationOrchestrator::new(
        session_id.clone(),
        state.assistant.clone(),
        outbound.clone(),
        state.config.call_settings(),
        completion,
    );
    let mut orchestrator_task = tokio::spawn(orchestrator.run(event_rx));

    let idle_hangup = outbound.clone();
    let mut session = CallSession::new(
        session_id.clone(),
        stt,
        event_tx,
        outbound,
        state.config.retry.clone(),
    );

    let idle_timeout = state.config.idle_timeout();
    let mut last_activity = Instant::now();

    // Frames that arrived while an earlier frame was still being handled.
    let mut backlog: VecDeque<ClientMessage> = VecDeque::new();

    'call: loop {
        if ended.is_cancelled() {
            info!(session_id = %session_id, "Call ended by assistant");
            break;
        }

        let message = match backlog.pop_front() {
            Some(message) => message,
            None => select! {
                _ = ended.cancelled() => {
                    info!(session_id = %session_id, "Call ended by assistant");
                    break;
                }
                msg_result = ws_receiver.next() => {
                    last_activity = Instant::now();
                    match classify_inbound(&session_id, msg_result) {
                        Inbound::Frame(message) => message,
                        Inbound::Ignored => continue,
                        Inbound::Closed => break,
                    }
                }
                _ = tokio::time::sleep_until(last_activity + idle_timeout) => {
                    warn!(
                        session_id = %session_id,
                        idle_secs = idle_timeout.as_secs(),
                        "Call idle for too long, hanging up"
                    );
                    idle_hangup.end_call().await;
                    break;
                }
            },
        };

        // An end-of-speech flush waits on transcription. Keep watching the
        // socket meanwhile so a hangup is not held up behind it; any other
        // frames are kept in arrival order for afterwards.
        let handled = session.on_frame(message);
        tokio::pin!(handled);
        loop {
            select! {
                _ = &mut handled => break,
                _ = ended.cancelled() => {
                    info!(session_id = %session_id, "Call ended by assistant");
                    break 'call;
                }
                msg_result = ws_receiver.next() => {
                    last_activity = Instant::now();
                    match classify_inbound(&session_id, msg_result) {
                        Inbound::Frame(message) => backlog.push_back(message),
                        Inbound::Ignored => {}
                        Inbound::Closed => {
                            info!(session_id = %session_id, "Caller hung up during transcription");
                            break 'call;
                        }
                    }
                }
            }
        }
    }

    // Cleanup: the hangup event reaches the orchestrator before the session
    // drops its event sender.
    session.close().await;
    drop(session);
    drop(idle_hangup);

    match timeout(SHUTDOWN_GRACE, &mut orchestrator_task).await {
        Ok(Ok(orchestrator)) => debug!(
            session_id = %session_id,
            turns = orchestrator.history().len(),
            log_entries = orchestrator.call_log().len(),
            "Conversation finished"
        ),
        Ok(Err(e)) => error!(session_id = %session_id, error = %e, "Conversation task failed"),
        Err(_) => {
            warn!(session_id = %session_id, "Conversation did not finish in time");
            orchestrator_task.abort();
        }
    }

    // Let queued frames (departure cue, close) drain before tearing down.
    if timeout(SHUTDOWN_GRACE, &mut sender_task).await.is_err() {
        sender_task.abort();
    }

    info!(session_id = %session_id, "Call terminated");
}

/// What the reader loop should do with one item from the socket.
enum Inbound {
    Frame(ClientMessage),
    /// Ping, pong and other frames with no call meaning.
    Ignored,
    Closed,
}

fn classify_inbound(
    session_id: &str,
    msg_result: Option<Result<Message, axum::Error>>,
) -> Inbound {
    match msg_result {
        Some(Ok(Message::Binary(data))) => {
            let (message, remainder) = ClientMessage::from_binary(&data);
            if remainder > 0 {
                debug!(
                    session_id = %session_id,
                    remainder,
                    "Dropped trailing bytes of a partial sample"
                );
            }
            Inbound::Frame(message)
        }
        Some(Ok(Message::Text(text))) => Inbound::Frame(ClientMessage::from_text(text.as_str())),
        Some(Ok(Message::Close(_))) | None => {
            info!(session_id = %session_id, "Call closed by caller");
            Inbound::Closed
        }
        Some(Ok(_)) => Inbound::Ignored,
        Some(Err(e)) => {
            warn!(session_id = %session_id, error = %e, "Call WebSocket error");
            Inbound::Closed
        }
    }
}
