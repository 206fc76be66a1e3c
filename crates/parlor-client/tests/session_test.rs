//! Session scenarios driven directly through `Session::handle`.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use parlor_client::{
    Credentials, RenderTarget, Session, SessionAction, SessionConfig, SessionError, SessionEvent,
    SyncRequest, SyncResponse,
};
use parlor_core::{ConnectionStatus, Environment};
use parlor_proto::{ConversationSummary, OutboundKind};
use serde_json::{Value, json};

/// Manually advanced clock.
#[derive(Clone)]
struct TestEnv {
    base: Instant,
    offset_ms: Arc<AtomicU64>,
}

impl TestEnv {
    fn new() -> Self {
        Self { base: Instant::now(), offset_ms: Arc::new(AtomicU64::new(0)) }
    }

    fn advance(&self, by: Duration) -> Instant {
        self.offset_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        self.now()
    }
}

impl Environment for TestEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::milliseconds(self.offset_ms.load(Ordering::SeqCst) as i64)
    }
}

const ME: u64 = 1;

fn session() -> (Session<TestEnv>, TestEnv) {
    let env = TestEnv::new();
    let config = SessionConfig::new("wss://forum.example").unwrap();
    let session = Session::new(env.clone(), Arc::new(Credentials::new(ME, "tok")), config);
    (session, env)
}

fn open(session: &mut Session<TestEnv>) -> Vec<SessionAction> {
    let _ = session.handle(SessionEvent::Connect).unwrap();
    session.handle(SessionEvent::SocketOpened).unwrap()
}

fn transmitted(actions: &[SessionAction]) -> Vec<Value> {
    actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Transmit { text, .. } => Some(serde_json::from_str(text).unwrap()),
            _ => None,
        })
        .collect()
}

fn closed(code: Option<u16>) -> SessionEvent {
    SessionEvent::SocketClosed { code, reason: String::new() }
}

#[test]
fn connect_opens_socket_with_token() {
    let (mut session, _) = session();

    let actions = session.handle(SessionEvent::Connect).unwrap();

    let urls: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::OpenSocket { url } => Some(url.as_str().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(urls, vec!["wss://forum.example/ws?token=tok"]);
    assert_eq!(session.state().self_id(), Some(ME));
}

#[test]
fn connect_is_idempotent() {
    let (mut session, _) = session();

    let first = session.handle(SessionEvent::Connect).unwrap();
    let second = session.handle(SessionEvent::Connect).unwrap();
    let _ = session.handle(SessionEvent::SocketOpened).unwrap();
    let third = session.handle(SessionEvent::Connect).unwrap();

    let opens = |actions: &[SessionAction]| {
        actions.iter().filter(|a| matches!(a, SessionAction::OpenSocket { .. })).count()
    };
    assert_eq!(opens(&first), 1);
    assert_eq!(opens(&second), 0);
    assert_eq!(opens(&third), 0);
}

#[test]
fn late_open_after_connect_timeout_is_ignored() {
    let (mut session, env) = session();
    let _ = session.handle(SessionEvent::Connect).unwrap();

    let now = env.advance(Duration::from_secs(10));
    let actions = session.handle(SessionEvent::Tick { now }).unwrap();
    assert!(actions.iter().any(|a| matches!(a, SessionAction::CloseSocket { code: 4001, .. })));

    let actions = session.handle(SessionEvent::SocketOpened).unwrap();
    assert!(actions.is_empty());
    assert!(!session.connection().is_open());
}

#[test]
fn connect_without_credentials_is_refused() {
    let env = TestEnv::new();
    let config = SessionConfig::new("wss://forum.example").unwrap();
    let mut session = Session::new(env, Arc::new(None::<Credentials>), config);

    assert_eq!(session.handle(SessionEvent::Connect), Err(SessionError::NotAuthenticated));
    assert!(!session.connection().is_open());
}

#[test]
fn message_sent_while_disconnected_is_delivered_once_on_open() {
    let (mut session, env) = session();

    let actions = session.handle(SessionEvent::SendMessage { to: 7, content: "hi".into() }).unwrap();
    assert!(transmitted(&actions).is_empty());
    assert_eq!(session.queue().len(), 1);

    let actions = open(&mut session);
    let frames = transmitted(&actions);

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "private_message");
    assert_eq!(frames[0]["data"], json!({"receiver_id": 7, "content": "hi"}));
    assert!(session.queue().is_empty());

    let again = session.handle(SessionEvent::Tick { now: env.advance(Duration::from_secs(1)) }).unwrap();
    assert!(transmitted(&again).is_empty());
}

#[test]
fn queued_messages_flush_in_order() {
    let (mut session, _) = session();
    for content in ["one", "two", "three"] {
        let _ = session.handle(SessionEvent::SendMessage { to: 7, content: content.into() }).unwrap();
    }

    let frames = transmitted(&open(&mut session));
    let contents: Vec<_> = frames.iter().map(|f| f["data"]["content"].as_str().unwrap().to_string()).collect();
    assert_eq!(contents, vec!["one", "two", "three"]);
}

#[test]
fn open_requests_bulk_refresh() {
    let (mut session, _) = session();
    let actions = open(&mut session);

    assert!(actions.contains(&SessionAction::Status(ConnectionStatus::Connected)));
    assert!(actions.contains(&SessionAction::Sync(SyncRequest::Conversations)));
    assert!(actions.contains(&SessionAction::Sync(SyncRequest::Users)));
}

#[test]
fn undelivered_frames_go_back_to_the_head_of_the_queue() {
    let (mut session, _) = session();
    let _ = open(&mut session);

    let actions = session.handle(SessionEvent::SendMessage { to: 7, content: "first".into() }).unwrap();
    let frames: Vec<_> = actions
        .into_iter()
        .filter_map(|a| match a {
            SessionAction::Transmit { frame, .. } => Some(frame),
            _ => None,
        })
        .collect();
    assert_eq!(frames.len(), 1);

    let _ = session.handle(closed(Some(1006))).unwrap();
    let _ = session.handle(SessionEvent::SendMessage { to: 7, content: "second".into() }).unwrap();
    let _ = session.handle(SessionEvent::Undelivered(frames)).unwrap();

    let contents: Vec<_> =
        session.queue().iter().map(|f| f.payload["content"].as_str().unwrap().to_string()).collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[test]
fn backoff_schedule_then_give_up() {
    let (mut session, env) = session();
    let _ = open(&mut session);

    let mut delays = Vec::new();
    for _ in 0..5 {
        let actions = session.handle(closed(Some(1006))).unwrap();
        let delay = actions
            .iter()
            .find_map(|a| match a {
                SessionAction::Status(ConnectionStatus::Reconnecting { delay, .. }) => Some(*delay),
                _ => None,
            })
            .unwrap();
        delays.push(delay.as_millis());

        let now = env.advance(delay);
        let actions = session.handle(SessionEvent::Tick { now }).unwrap();
        assert!(actions.iter().any(|a| matches!(a, SessionAction::OpenSocket { .. })));
    }
    assert_eq!(delays, vec![2000, 4000, 8000, 16_000, 30_000]);

    let actions = session.handle(closed(None)).unwrap();
    assert!(actions.contains(&SessionAction::ReconnectionFailed { attempts: 5 }));

    let now = env.advance(Duration::from_secs(3600));
    let actions = session.handle(SessionEvent::Tick { now }).unwrap();
    assert!(!actions.iter().any(|a| matches!(a, SessionAction::OpenSocket { .. })));

    // Explicit retry starts over.
    let actions = session.handle(SessionEvent::Connect).unwrap();
    assert!(actions.iter().any(|a| matches!(a, SessionAction::OpenSocket { .. })));
    assert_eq!(session.connection().attempt(), 0);
}

#[test]
fn normal_close_does_not_reconnect() {
    let (mut session, env) = session();
    let _ = open(&mut session);

    let actions = session.handle(closed(Some(1000))).unwrap();
    assert!(actions.contains(&SessionAction::Status(ConnectionStatus::Disconnected)));

    let now = env.advance(Duration::from_secs(120));
    let actions = session.handle(SessionEvent::Tick { now }).unwrap();
    assert!(!actions.iter().any(|a| matches!(a, SessionAction::OpenSocket { .. })));
}

#[test]
fn close_clears_presence() {
    let (mut session, _) = session();
    let _ = open(&mut session);
    let _ = session
        .handle(SessionEvent::FrameReceived(json!({"type": "online_users", "data": {"user_ids": [2, 3]}}).to_string()))
        .unwrap();
    assert!(session.state().is_online(2));

    let _ = session.handle(closed(Some(1006))).unwrap();

    assert!(session.state().online_users().is_empty());
}

#[test]
fn heartbeat_sends_ping() {
    let (mut session, env) = session();
    let _ = open(&mut session);

    let now = env.advance(Duration::from_secs(30));
    let frames = transmitted(&session.handle(SessionEvent::Tick { now }).unwrap());

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "ping");
}

#[test]
fn typing_is_not_queued() {
    let (mut session, _) = session();

    let actions = session.handle(SessionEvent::SendTyping { to: 7 }).unwrap();
    assert!(actions.is_empty());
    assert!(session.queue().is_empty());

    let _ = open(&mut session);
    let actions = session.handle(SessionEvent::SendTyping { to: 7 }).unwrap();
    match actions.as_slice() {
        [SessionAction::Transmit { frame, text }] => {
            assert_eq!(frame.kind, OutboundKind::Typing);
            let value: Value = serde_json::from_str(text).unwrap();
            assert_eq!(value["data"], json!({"receiver_id": 7}));
        },
        other => panic!("expected one transmit, got {other:?}"),
    }
}

#[test]
fn empty_message_is_rejected() {
    let (mut session, _) = session();
    assert_eq!(
        session.handle(SessionEvent::SendMessage { to: 7, content: "  ".into() }),
        Err(SessionError::EmptyMessage)
    );
    assert!(session.queue().is_empty());
}

#[test]
fn unauthorized_sync_expires_session() {
    let (mut session, _) = session();
    let _ = open(&mut session);

    let actions = session
        .handle(SessionEvent::SyncFailed {
            request: SyncRequest::Conversations,
            error: "401".into(),
            unauthorized: true,
        })
        .unwrap();

    assert_eq!(actions[0], SessionAction::SessionExpired);
    assert!(actions.iter().any(|a| matches!(a, SessionAction::CloseSocket { code: 1000, .. })));
}

#[test]
fn other_sync_failures_notify() {
    let (mut session, _) = session();
    let actions = session
        .handle(SessionEvent::SyncFailed { request: SyncRequest::Users, error: "HTTP 500".into(), unauthorized: false })
        .unwrap();
    assert!(matches!(actions.as_slice(), [SessionAction::Notify { .. }]));
}

#[test]
fn inbound_message_for_inactive_peer() {
    let (mut session, _) = session();
    let _ = open(&mut session);
    let _ = session.handle(SessionEvent::SelectConversation { peer: 5 }).unwrap();

    let raw = json!({
        "type": "private_message",
        "data": {"id": 90, "sender_id": 3, "receiver_id": ME, "content": "yo", "created_at": "2026-03-01T10:00:00Z"},
        "timestamp": "2026-03-01T10:00:00Z"
    })
    .to_string();
    let actions = session.handle(SessionEvent::FrameReceived(raw)).unwrap();

    assert_eq!(session.state().unread(3), 1);
    assert_eq!(session.state().unread(5), 0);
    assert!(actions.contains(&SessionAction::Render(RenderTarget::ConversationList)));
    assert!(!actions.iter().any(|a| matches!(a, SessionAction::FeedUpdate(_))));
}

#[test]
fn snapshot_after_open_is_merged() {
    let (mut session, _) = session();
    let _ = open(&mut session);

    let mut row = ConversationSummary::new(4);
    row.username = Some("dana".into());
    row.unread_count = Some(2);
    row.is_online = Some(true);
    let _ = session.handle(SessionEvent::SyncCompleted(SyncResponse::Conversations(vec![row]))).unwrap();

    let conv = session.state().conversation(4).unwrap();
    assert_eq!(conv.name(), "dana");
    assert_eq!(conv.unread_count, 2);
    assert!(conv.is_online && session.state().is_online(4));
}
