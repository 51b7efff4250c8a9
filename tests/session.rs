//! End-to-end session tests against an in-process WebSocket mock hub.
//!
//! The hub accepts connections on the real endpoint path and hands each
//! one to the test as a pair of channels: inbound frames from the client
//! and an action queue for scripted sends, graceful closes, or abrupt
//! drops.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::{Notify, mpsc};

use region_chat_engine::auth::StaticCredentials;
use region_chat_engine::config::ChatConfig;
use region_chat_engine::domain::{Message, MessageId, RegionId};
use region_chat_engine::error::ChatError;
use region_chat_engine::history::HistoryProvider;
use region_chat_engine::session::{ChatSession, ConnectionState, MessageDraft, SessionEvent};

/// Scripted hub-side behavior for one connection.
enum HubAction {
    Send(String),
    Close(u16),
}

/// One accepted connection, driven by the test.
struct HubConn {
    frames: mpsc::UnboundedReceiver<String>,
    actions: mpsc::UnboundedSender<HubAction>,
}

impl HubConn {
    fn send(&self, text: &str) {
        let _ = self.actions.send(HubAction::Send(text.to_string()));
    }

    fn close(&self, code: u16) {
        let _ = self.actions.send(HubAction::Close(code));
    }

    async fn next_frame(&mut self) -> String {
        match tokio::time::timeout(Duration::from_secs(3), self.frames.recv()).await {
            Ok(Some(frame)) => frame,
            _ => panic!("timed out waiting for a client frame"),
        }
    }
}

async fn serve_socket(mut socket: WebSocket, conns: mpsc::UnboundedSender<HubConn>) {
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let _ = conns.send(HubConn {
        frames: frame_rx,
        actions: action_tx,
    });

    loop {
        tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = frame_tx.send(text.to_string());
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            action = action_rx.recv() => match action {
                Some(HubAction::Send(text)) => {
                    if socket.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(HubAction::Close(code)) => {
                    let _ = socket
                        .send(WsMessage::Close(Some(CloseFrame {
                            code,
                            reason: "test".into(),
                        })))
                        .await;
                    break;
                }
                // HubConn dropped: abrupt disconnect without a close frame.
                None => break,
            },
        }
    }
}

async fn start_hub() -> (SocketAddr, mpsc::UnboundedReceiver<HubConn>) {
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route(
            "/ws/chat/region",
            get(
                |State(conns): State<mpsc::UnboundedSender<HubConn>>,
                 ws: WebSocketUpgrade| async move {
                    ws.on_upgrade(move |socket| serve_socket(socket, conns))
                        .into_response()
                },
            ),
        )
        .with_state(conn_tx);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("cannot bind hub listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("cannot read hub address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, conn_rx)
}

async fn accept(conns: &mut mpsc::UnboundedReceiver<HubConn>) -> HubConn {
    match tokio::time::timeout(Duration::from_secs(3), conns.recv()).await {
        Ok(Some(conn)) => conn,
        _ => panic!("timed out waiting for a connection"),
    }
}

async fn wait_for<F>(events: &mut mpsc::UnboundedReceiver<SessionEvent>, mut pred: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    let found = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let Some(event) = events.recv().await else {
                panic!("event stream ended unexpectedly");
            };
            if pred(&event) {
                return event;
            }
        }
    })
    .await;
    match found {
        Ok(event) => event,
        Err(_) => panic!("timed out waiting for a session event"),
    }
}

fn test_config(addr: SocketAddr) -> ChatConfig {
    ChatConfig {
        ws_base_url: format!("ws://{addr}"),
        history_base_url: format!("http://{addr}"),
        region_id: RegionId::new(1),
        sender_id: "tester".to_string(),
        history_limit: 50,
        connect_timeout: Duration::from_secs(2),
        heartbeat_interval: Duration::from_secs(30),
        reconnect_max_attempts: 5,
        reconnect_base_delay: Duration::from_millis(30),
        typing_idle_window: Duration::from_millis(80),
        throttle_window: Duration::from_millis(1),
    }
}

/// History stub returning nothing, immediately.
#[derive(Debug, Default)]
struct NoHistory;

#[async_trait]
impl HistoryProvider for NoHistory {
    async fn recent_messages(
        &self,
        _region_id: RegionId,
        _limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        Ok(Vec::new())
    }
}

/// History stub that blocks until the test opens the gate, so the
/// history/live interleaving is deterministic.
#[derive(Debug)]
struct GatedHistory {
    gate: Arc<Notify>,
    batch: Vec<Message>,
}

#[async_trait]
impl HistoryProvider for GatedHistory {
    async fn recent_messages(
        &self,
        _region_id: RegionId,
        _limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        self.gate.notified().await;
        Ok(self.batch.clone())
    }
}

fn history_message(id: &str) -> Message {
    Message {
        id: MessageId::from(id),
        sender_id: "bob".to_string(),
        content: format!("text-{id}"),
        created_at: chrono::Utc::now(),
        attachments: None,
    }
}

fn content_frame(id: &str, text: &str) -> String {
    format!(
        r#"{{"id":"{id}","senderId":"bob","content":"{text}","createdAt":"2024-05-01T10:00:00Z"}}"#
    )
}

fn spawn_session(
    config: ChatConfig,
    history: Arc<dyn HistoryProvider>,
) -> (ChatSession, mpsc::UnboundedReceiver<SessionEvent>) {
    ChatSession::spawn(config, Arc::new(StaticCredentials::new("test-token")), history)
}

#[tokio::test]
async fn presence_snapshot_reaches_presentation() {
    let (addr, mut conns) = start_hub().await;
    let (session, mut events) = spawn_session(test_config(addr), Arc::new(NoHistory));
    let conn = accept(&mut conns).await;

    conn.send(r#"{"type":"USERS","users":["a","b"]}"#);
    let event = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::PresenceChanged(_))
    })
    .await;
    let SessionEvent::PresenceChanged(users) = event else {
        panic!("wrong event");
    };
    assert_eq!(users, vec!["a".to_string(), "b".to_string()]);
    session.close();
}

#[tokio::test]
async fn duplicate_live_frames_are_admitted_once() {
    let (addr, mut conns) = start_hub().await;
    let (session, mut events) = spawn_session(test_config(addr), Arc::new(NoHistory));
    let conn = accept(&mut conns).await;

    conn.send(&content_frame("m1", "first"));
    conn.send(&content_frame("m1", "first again"));
    conn.send(&content_frame("m2", "second"));

    let mut admitted = Vec::new();
    let _ = wait_for(&mut events, |e| {
        if let SessionEvent::MessageAdmitted(message) = e {
            admitted.push(message.id.as_str().to_string());
            return message.id.as_str() == "m2";
        }
        false
    })
    .await;
    assert_eq!(admitted, vec!["m1".to_string(), "m2".to_string()]);
    session.close();
}

#[tokio::test]
async fn history_merges_ahead_of_earlier_live_messages() {
    let (addr, mut conns) = start_hub().await;
    let gate = Arc::new(Notify::new());
    let history = Arc::new(GatedHistory {
        gate: Arc::clone(&gate),
        batch: vec![
            history_message("h1"),
            history_message("live1"),
            history_message("h2"),
        ],
    });
    let (session, mut events) = spawn_session(test_config(addr), history);
    let conn = accept(&mut conns).await;

    // A live frame lands while the history fetch is still in flight.
    conn.send(&content_frame("live1", "hello"));
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::MessageAdmitted(m) if m.id.as_str() == "live1")
    })
    .await;

    gate.notify_one();
    let event = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::HistoryMerged(_))
    })
    .await;
    let SessionEvent::HistoryMerged(batch) = event else {
        panic!("wrong event");
    };
    let ids: Vec<&str> = batch.iter().map(|m| m.id.as_str()).collect();
    // The id already admitted from the live stream is deduplicated.
    assert_eq!(ids, vec!["h1", "h2"]);
    session.close();
}

#[tokio::test]
async fn normal_close_is_not_followed_by_reconnect() {
    let (addr, mut conns) = start_hub().await;
    let (session, mut events) = spawn_session(test_config(addr), Arc::new(NoHistory));
    let conn = accept(&mut conns).await;
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(ConnectionState::Open))
    })
    .await;

    conn.close(1000);
    let event = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Disconnected { .. })
    })
    .await;
    let SessionEvent::Disconnected { code, will_retry } = event else {
        panic!("wrong event");
    };
    assert_eq!(code, Some(1000));
    assert!(!will_retry);

    // Well past the base reconnect delay: no new connection, no schedule.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(conns.try_recv().is_err());
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, SessionEvent::ReconnectScheduled { .. }));
    }

    session.close();
    let _ = wait_for(&mut events, |e| matches!(e, SessionEvent::Closed)).await;
}

#[tokio::test]
async fn abnormal_drop_schedules_reconnect_and_recovers() {
    let (addr, mut conns) = start_hub().await;
    let (session, mut events) = spawn_session(test_config(addr), Arc::new(NoHistory));
    let conn = accept(&mut conns).await;
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(ConnectionState::Open))
    })
    .await;

    // Drop the hub side without a close frame.
    drop(conn);

    let event = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ReconnectScheduled { .. })
    })
    .await;
    let SessionEvent::ReconnectScheduled { attempt, .. } = event else {
        panic!("wrong event");
    };
    assert_eq!(attempt, 1);

    // The scheduled attempt lands on the hub as a fresh connection.
    let _conn2 = accept(&mut conns).await;
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(ConnectionState::Open))
    })
    .await;
    session.close();
}

#[tokio::test]
async fn exhausted_retries_report_terminal_failure() {
    // Reserve a port, then free it so every connect is refused.
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("cannot bind probe listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("cannot read probe address");
    };
    drop(listener);

    let mut config = test_config(addr);
    config.reconnect_max_attempts = 2;
    config.reconnect_base_delay = Duration::from_millis(10);
    let (session, mut events) = spawn_session(config, Arc::new(NoHistory));

    let event = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ConnectionUnavailable { .. })
    })
    .await;
    let SessionEvent::ConnectionUnavailable { attempts } = event else {
        panic!("wrong event");
    };
    assert_eq!(attempts, 2);
    session.close();
}

#[tokio::test]
async fn missing_credentials_surface_reauth_required() {
    let (addr, _conns) = start_hub().await;
    let (session, mut events) = ChatSession::spawn(
        test_config(addr),
        Arc::new(StaticCredentials::empty()),
        Arc::new(NoHistory),
    );
    let _ = wait_for(&mut events, |e| matches!(e, SessionEvent::ReauthRequired)).await;
    session.close();
}

#[tokio::test]
async fn heartbeat_pings_flow_while_open() {
    let (addr, mut conns) = start_hub().await;
    let mut config = test_config(addr);
    config.heartbeat_interval = Duration::from_millis(40);
    let (session, mut events) = spawn_session(config, Arc::new(NoHistory));
    let mut conn = accept(&mut conns).await;
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(ConnectionState::Open))
    })
    .await;

    let mut pings = 0;
    while pings < 2 {
        if conn.next_frame().await.contains("\"PING\"") {
            pings += 1;
        }
    }
    session.close();
}

#[tokio::test]
async fn peer_ping_is_answered_with_pong() {
    let (addr, mut conns) = start_hub().await;
    let (session, mut events) = spawn_session(test_config(addr), Arc::new(NoHistory));
    let mut conn = accept(&mut conns).await;
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(ConnectionState::Open))
    })
    .await;

    conn.send(r#"{"type":"PING"}"#);
    loop {
        if conn.next_frame().await.contains("\"PONG\"") {
            break;
        }
    }
    session.close();
}

#[tokio::test]
async fn typing_burst_emits_single_start_then_stop() {
    let (addr, mut conns) = start_hub().await;
    let (session, mut events) = spawn_session(test_config(addr), Arc::new(NoHistory));
    let mut conn = accept(&mut conns).await;
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(ConnectionState::Open))
    })
    .await;

    // Two rapid input events inside the inactivity window.
    session.input_activity();
    session.input_activity();

    let first = conn.next_frame().await;
    assert!(first.contains(r#""type":"TYPING""#), "got: {first}");
    assert!(first.contains(r#""isTyping":true"#), "got: {first}");

    // After the idle window only the stop frame follows.
    let second = conn.next_frame().await;
    assert!(second.contains(r#""isTyping":false"#), "got: {second}");
    session.close();
}

#[tokio::test]
async fn sent_draft_reaches_the_hub() {
    let (addr, mut conns) = start_hub().await;
    let (session, mut events) = spawn_session(test_config(addr), Arc::new(NoHistory));
    let mut conn = accept(&mut conns).await;
    let _ = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(ConnectionState::Open))
    })
    .await;

    session.send(MessageDraft::new("hello region"));
    let frame = conn.next_frame().await;
    assert!(frame.contains(r#""content":"hello region""#), "got: {frame}");
    assert!(frame.contains(r#""senderId":"tester""#), "got: {frame}");
    session.close();
}
