//! Connection lifecycle supervision.
//!
//! [`ChatSession`] spawns one cooperative task that owns everything mutable
//! in the session: the transport handle, the state machine, the timer
//! registry, the reconciler, presence, and typing state. All transitions
//! happen on that task; commands and events cross its boundary over mpsc
//! channels, so no shared-memory locking is needed.
//!
//! State machine: `Closed → Connecting → Open → Closing → Closed`. A
//! connect timeout or any non-normal closure schedules a reconnect through
//! the bounded policy; a 1000 close or an explicit `close()` does not.
//! Teardown always cancels every pending timer and detaches the transport
//! before the handle reference is cleared, so a late callback from a
//! superseded connection can never mutate current state.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::auth::CredentialProvider;
use crate::config::ChatConfig;
use crate::domain::{ControlFrame, InboundFrame, Message, OutboundControl, OutboundFrame, RegionId};
use crate::error::ChatError;
use crate::history::HistoryProvider;
use crate::session::composer::OutboundComposer;
use crate::session::events::{ConnectionState, SessionCommand, SessionEvent};
use crate::session::heartbeat::HeartbeatMonitor;
use crate::session::presence::PresenceTracker;
use crate::session::reconciler::MessageReconciler;
use crate::session::reconnect::ReconnectPolicy;
use crate::session::throttle::ActionThrottle;
use crate::session::timers::{TimerKind, TimerRegistry};
use crate::session::typing::TypingCoordinator;

/// Throttle key gating `open()`.
const ACTION_CONNECT: &str = "connect";
/// Throttle key gating the scheduled reconnect callback.
const ACTION_RECONNECT: &str = "reconnect";

type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;
type HistoryResult = Result<Vec<Message>, ChatError>;

/// Handle to a running chat session.
///
/// Cheap to clone; all methods enqueue a command for the session task and
/// return immediately. Once the session is closed, further commands are
/// ignored.
#[derive(Debug, Clone)]
pub struct ChatSession {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl ChatSession {
    /// Spawns a session for the configured region and queues the initial
    /// connection attempt. Returns the handle and the event stream.
    #[must_use]
    pub fn spawn(
        config: ChatConfig,
        credentials: Arc<dyn CredentialProvider>,
        history: Arc<dyn HistoryProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let supervisor = ConnectionSupervisor::new(config, credentials, history, cmd_rx, event_tx);
        tokio::spawn(supervisor.run());

        let session = Self { cmd_tx };
        session.open();
        (session, event_rx)
    }

    /// Requests a connection attempt (no-op inside the throttle window).
    pub fn open(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Open);
    }

    /// Composes and transmits a message. Best-effort: dropped silently if
    /// the connection is not open.
    pub fn send(&self, draft: crate::session::composer::MessageDraft) {
        let _ = self.cmd_tx.send(SessionCommand::Send(draft));
    }

    /// Reports a local input-change event for typing-state derivation.
    pub fn input_activity(&self) {
        let _ = self.cmd_tx.send(SessionCommand::InputActivity);
    }

    /// Tears the session down. Terminal; the event stream ends with
    /// [`SessionEvent::Closed`].
    pub fn close(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Close);
    }
}

/// What woke the session task up.
enum Tick {
    Command(Option<SessionCommand>),
    Frame(Option<Result<WsMessage, WsError>>),
    History(Result<HistoryResult, JoinError>),
    Deadline,
}

/// Owner of the connection's lifecycle state machine.
#[derive(Debug)]
struct ConnectionSupervisor {
    config: ChatConfig,
    credentials: Arc<dyn CredentialProvider>,
    history: Arc<dyn HistoryProvider>,

    state: ConnectionState,
    transport: Option<Transport>,
    /// Per-attempt id tying log lines to one transport instance.
    conn_id: uuid::Uuid,

    reconnect: ReconnectPolicy,
    throttle: ActionThrottle,
    heartbeat: HeartbeatMonitor,
    timers: TimerRegistry,
    reconciler: MessageReconciler,
    presence: PresenceTracker,
    typing: TypingCoordinator,
    composer: OutboundComposer,

    cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,

    history_task: Option<JoinHandle<HistoryResult>>,
    history_requested: bool,
    /// Refresh the credential before the next connect attempt.
    refresh_before_connect: bool,
    /// Reentrancy guard for the synchronous-close case.
    closing: bool,
}

impl ConnectionSupervisor {
    fn new(
        config: ChatConfig,
        credentials: Arc<dyn CredentialProvider>,
        history: Arc<dyn HistoryProvider>,
        cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            reconnect: ReconnectPolicy::new(
                config.reconnect_max_attempts,
                config.reconnect_base_delay,
            ),
            throttle: ActionThrottle::new(config.throttle_window),
            heartbeat: HeartbeatMonitor::new(config.heartbeat_interval),
            timers: TimerRegistry::new(),
            reconciler: MessageReconciler::new(),
            presence: PresenceTracker::new(),
            typing: TypingCoordinator::new(config.typing_idle_window),
            composer: OutboundComposer::new(config.sender_id.clone()),
            state: ConnectionState::Closed,
            transport: None,
            conn_id: uuid::Uuid::new_v4(),
            cmd_rx,
            events,
            history_task: None,
            history_requested: false,
            refresh_before_connect: false,
            closing: false,
            config,
            credentials,
            history,
        }
    }

    /// Single cooperative event loop owning all session state.
    async fn run(mut self) {
        loop {
            let deadline = self.timers.next_deadline();
            let tick = tokio::select! {
                cmd = self.cmd_rx.recv() => Tick::Command(cmd),
                frame = next_frame(&mut self.transport), if self.transport.is_some() => {
                    Tick::Frame(frame)
                }
                joined = join_history(&mut self.history_task), if self.history_task.is_some() => {
                    Tick::History(joined)
                }
                () = sleep_until_deadline(deadline), if deadline.is_some() => Tick::Deadline,
            };

            match tick {
                Tick::Command(Some(cmd)) => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                // All handles dropped: tear down like an explicit close.
                Tick::Command(None) => {
                    self.close().await;
                    break;
                }
                Tick::Frame(frame) => self.handle_frame(frame).await,
                Tick::History(joined) => self.handle_history(joined),
                Tick::Deadline => self.handle_deadlines().await,
            }
        }

        if let Some(task) = self.history_task.take() {
            task.abort();
        }
        tracing::debug!(region = %self.config.region_id, "session task finished");
    }

    /// Returns `false` when the session should terminate.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Open => {
                if self.state == ConnectionState::Closed
                    && !self.timers.is_scheduled(TimerKind::Reconnect)
                    && self.throttle.try_fire(ACTION_CONNECT, Instant::now())
                {
                    self.connect().await;
                }
            }
            SessionCommand::Send(draft) => {
                if self.state != ConnectionState::Open {
                    tracing::debug!(conn = %self.conn_id, "outbound send dropped while not open");
                    return true;
                }
                if let Some(payload) = self.composer.compose(draft) {
                    self.transmit(OutboundFrame::Message(payload)).await;
                }
            }
            SessionCommand::InputActivity => {
                let now = Instant::now();
                if self.typing.on_local_input(now) {
                    self.transmit(OutboundFrame::Control(OutboundControl::Typing {
                        is_typing: true,
                    }))
                    .await;
                }
                if let Some(deadline) = self.typing.stop_deadline() {
                    self.timers.schedule(TimerKind::TypingStop, deadline);
                }
            }
            SessionCommand::Close => {
                self.close().await;
                return false;
            }
        }
        true
    }

    /// Opens the transport, bounded by the connect timeout.
    async fn connect(&mut self) {
        let Some(token) = self.acquire_token().await else {
            tracing::warn!(region = %self.config.region_id, "no usable credential");
            self.set_state(ConnectionState::Closed);
            self.emit(SessionEvent::ReauthRequired);
            return;
        };

        let url = match endpoint_url(&self.config.ws_base_url, self.config.region_id, &token) {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(error = %err, "cannot build endpoint url");
                self.set_state(ConnectionState::Closed);
                self.emit(SessionEvent::ConnectionUnavailable {
                    attempts: self.reconnect.attempt_count(),
                });
                return;
            }
        };

        self.conn_id = uuid::Uuid::new_v4();
        self.set_state(ConnectionState::Connecting);
        tracing::info!(conn = %self.conn_id, region = %self.config.region_id, "connecting");

        match tokio::time::timeout(self.config.connect_timeout, connect_async(url.as_str())).await {
            Ok(Ok((stream, _response))) => {
                self.transport = Some(stream);
                self.set_state(ConnectionState::Open);
                // Attempt counter resets exactly on transition into Open.
                self.reconnect.reset();
                self.heartbeat.reset();
                let now = Instant::now();
                self.timers
                    .schedule(TimerKind::Heartbeat, self.heartbeat.next_ping_at(now));
                tracing::info!(conn = %self.conn_id, "connected");
                self.request_history();
            }
            Ok(Err(err)) => {
                tracing::warn!(conn = %self.conn_id, error = %err, "connect failed");
                // A transport error while connecting may be an expired
                // token: refresh before the next attempt.
                self.refresh_before_connect = true;
                self.abandon_attempt();
                self.schedule_reconnect();
            }
            Err(_elapsed) => {
                tracing::warn!(
                    conn = %self.conn_id,
                    timeout = ?self.config.connect_timeout,
                    "connect timed out"
                );
                self.abandon_attempt();
                self.schedule_reconnect();
            }
        }
    }

    /// Resolves the bearer token for the next connect attempt.
    ///
    /// After a failed attempt a refresh is tried first; if refresh fails
    /// the original credential is used once more. A missing credential
    /// falls back to one refresh before giving up.
    async fn acquire_token(&mut self) -> Option<String> {
        if self.refresh_before_connect {
            self.refresh_before_connect = false;
            if let Some(token) = self.credentials.refresh_token().await {
                return Some(token);
            }
            return self.credentials.get_token().await;
        }
        match self.credentials.get_token().await {
            Some(token) => Some(token),
            None => self.credentials.refresh_token().await,
        }
    }

    /// Tears down a failed connect attempt: `Closing → Closed` with all
    /// timers cancelled before the handle is cleared.
    fn abandon_attempt(&mut self) {
        self.set_state(ConnectionState::Closing);
        self.detach_transport();
        self.set_state(ConnectionState::Closed);
    }

    /// Cancels every pending timer and drops the transport handle, in that
    /// order, so nothing belonging to the superseded connection fires.
    fn detach_transport(&mut self) {
        self.timers.cancel_all();
        self.typing.reset_local();
        self.heartbeat.reset();
        self.transport = None;
    }

    async fn handle_frame(&mut self, frame: Option<Result<WsMessage, WsError>>) {
        match frame {
            Some(Ok(WsMessage::Text(text))) => self.route_text(text.as_str()).await,
            Some(Ok(WsMessage::Close(close))) => {
                let code = close.map(|f| u16::from(f.code));
                tracing::info!(conn = %self.conn_id, ?code, "transport closed by peer");
                self.on_transport_close(code).await;
            }
            // WebSocket-level ping/pong and binary frames are not part of
            // the chat protocol; the library answers pings on its own.
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                tracing::warn!(conn = %self.conn_id, error = %err, "transport error");
                self.on_transport_close(None).await;
            }
            None => {
                tracing::warn!(conn = %self.conn_id, "transport stream ended");
                self.on_transport_close(None).await;
            }
        }
    }

    /// Decodes and routes one inbound text frame.
    async fn route_text(&mut self, text: &str) {
        match InboundFrame::decode(text) {
            Ok(InboundFrame::Control(control)) => match control {
                ControlFrame::Ping => {
                    // Reply immediately, outside the heartbeat cadence.
                    self.transmit(OutboundFrame::Control(OutboundControl::Pong))
                        .await;
                }
                ControlFrame::Pong => self.heartbeat.record_pong(Instant::now()),
                ControlFrame::Typing {
                    member_name,
                    is_typing,
                } => {
                    if self.typing.on_remote(&member_name, is_typing) {
                        self.emit(SessionEvent::TypingChanged(self.typing.remote_typers()));
                    }
                }
                ControlFrame::Presence { users } => {
                    if self.presence.replace(users) {
                        self.emit(SessionEvent::PresenceChanged(self.presence.users()));
                    }
                }
            },
            Ok(InboundFrame::Content(message)) => {
                if self.reconciler.admit_live(message.clone()) {
                    self.emit(SessionEvent::MessageAdmitted(message));
                }
            }
            Err(err) => {
                tracing::warn!(conn = %self.conn_id, error = %err, "discarding malformed frame");
            }
        }
    }

    /// Handles a closure of the open transport, classified by close code.
    async fn on_transport_close(&mut self, code: Option<u16>) {
        if self.closing {
            return;
        }
        self.set_state(ConnectionState::Closing);
        self.detach_transport();
        self.set_state(ConnectionState::Closed);

        let normal = code == Some(1000);
        let will_retry =
            !normal && self.reconnect.attempt_count() < self.reconnect.max_attempts();
        self.emit(SessionEvent::Disconnected { code, will_retry });

        if !normal {
            self.schedule_reconnect();
        }
    }

    /// Asks the policy for another attempt; schedules it or reports the
    /// terminal failure upward.
    fn schedule_reconnect(&mut self) {
        match self.reconnect.next_delay() {
            Some(delay) => {
                let attempt = self.reconnect.attempt_count();
                self.timers
                    .schedule(TimerKind::Reconnect, Instant::now() + delay);
                tracing::info!(attempt, ?delay, "reconnect scheduled");
                self.emit(SessionEvent::ReconnectScheduled { attempt, delay });
            }
            None => {
                let attempts = self.reconnect.max_attempts();
                tracing::error!(attempts, "reconnect attempts exhausted");
                self.emit(SessionEvent::ConnectionUnavailable { attempts });
            }
        }
    }

    /// Spawns the one-shot history fetch; live frames keep flowing while
    /// it is in flight and are deduplicated when the batch merges.
    fn request_history(&mut self) {
        if self.history_requested {
            return;
        }
        self.history_requested = true;
        let provider = Arc::clone(&self.history);
        let region_id = self.config.region_id;
        let limit = self.config.history_limit;
        self.history_task = Some(tokio::spawn(async move {
            provider.recent_messages(region_id, limit).await
        }));
    }

    fn handle_history(&mut self, joined: Result<HistoryResult, JoinError>) {
        self.history_task = None;
        match joined {
            Ok(Ok(batch)) => {
                let admitted = self.reconciler.merge_history(batch);
                tracing::debug!(admitted = admitted.len(), "history merged");
                if !admitted.is_empty() {
                    self.emit(SessionEvent::HistoryMerged(admitted));
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "history fetch failed");
            }
            Err(err) => {
                tracing::warn!(error = %err, "history task failed");
            }
        }
    }

    /// Fires every due timer.
    async fn handle_deadlines(&mut self) {
        let now = Instant::now();
        for kind in self.timers.take_due(now) {
            match kind {
                TimerKind::Heartbeat => {
                    if self.state == ConnectionState::Open {
                        self.transmit(OutboundFrame::Control(OutboundControl::Ping))
                            .await;
                        self.timers
                            .schedule(TimerKind::Heartbeat, self.heartbeat.next_ping_at(now));
                    }
                }
                TimerKind::TypingStop => {
                    if self.typing.on_stop_deadline(now) {
                        self.transmit(OutboundFrame::Control(OutboundControl::Typing {
                            is_typing: false,
                        }))
                        .await;
                    }
                }
                TimerKind::Reconnect => {
                    if self.throttle.try_fire(ACTION_RECONNECT, now) {
                        self.connect().await;
                    }
                }
            }
        }
    }

    /// Sends one frame on the open transport. Drops it silently when the
    /// connection is not open; a send failure is treated as an abnormal
    /// closure.
    async fn transmit(&mut self, frame: OutboundFrame) {
        if self.state != ConnectionState::Open {
            tracing::debug!(conn = %self.conn_id, "outbound frame dropped while not open");
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let text = match frame.encode() {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "outbound frame encoding failed");
                return;
            }
        };
        if let Err(err) = transport.send(WsMessage::text(text)).await {
            tracing::warn!(conn = %self.conn_id, error = %err, "send failed");
            self.on_transport_close(None).await;
        }
    }

    /// Explicit teardown; terminal. Guarded against reentry so a
    /// close-in-progress cannot be re-entered.
    async fn close(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.set_state(ConnectionState::Closing);

        if let Some(transport) = self.transport.as_mut() {
            let _ = transport
                .close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: Utf8Bytes::from_static("session closed"),
                }))
                .await;
        }

        self.detach_transport();
        self.set_state(ConnectionState::Closed);
        self.emit(SessionEvent::Closed);
        tracing::info!(region = %self.config.region_id, "session closed");
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        tracing::debug!(
            conn = %self.conn_id,
            from = ?self.state,
            to = ?next,
            "state transition"
        );
        self.state = next;
        self.emit(SessionEvent::StateChanged(next));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Builds the transport endpoint with a percent-encoded bearer token.
fn endpoint_url(base: &str, region_id: RegionId, token: &str) -> Result<Url, ChatError> {
    let mut url = Url::parse(base)
        .map_err(|e| ChatError::Config(format!("invalid websocket base url: {e}")))?;
    url.set_path("/ws/chat/region");
    url.query_pairs_mut()
        .append_pair("regionId", &region_id.to_string())
        .append_pair("token", token);
    Ok(url)
}

/// Polls the transport when present; pends forever otherwise (the select
/// guard keeps this arm disabled while there is no connection).
async fn next_frame(transport: &mut Option<Transport>) -> Option<Result<WsMessage, WsError>> {
    match transport.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Joins the in-flight history task when present; pends forever otherwise.
async fn join_history(
    task: &mut Option<JoinHandle<HistoryResult>>,
) -> Result<HistoryResult, JoinError> {
    match task.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Sleeps until the earliest registry deadline; pends when none is set.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
