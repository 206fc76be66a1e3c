//! UI adapter that records every call.

use parlor_app::UiAdapter;
use parlor_client::Conversation;
use parlor_core::ConnectionStatus;
use parlor_proto::{FeedEvent, MessageId, UserId};

/// One recorded UI call.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    /// Conversation list redraw: `(peer, unread, online)` in display order.
    ConversationList {
        /// Rows as rendered.
        rows: Vec<(UserId, u32, bool)>,
        /// Highlighted conversation.
        active: Option<UserId>,
    },
    /// Message list redraw.
    Messages {
        /// Peer of the conversation.
        peer: UserId,
        /// Message ids as rendered.
        ids: Vec<MessageId>,
    },
    /// Typing indicator change.
    Typing {
        /// Peer.
        peer: UserId,
        /// Shown or hidden.
        active: bool,
    },
    /// Connection status line.
    Status(ConnectionStatus),
    /// Feed update.
    Feed(FeedEvent),
    /// Notification.
    Notice {
        /// Message.
        message: String,
        /// Code, if any.
        code: Option<String>,
    },
    /// Reconnect attempts exhausted.
    ReconnectionFailed(u32),
    /// Credentials rejected.
    SessionExpired,
}

/// [`UiAdapter`] that keeps a log of every call.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    calls: Vec<UiCall>,
}

impl RecordingAdapter {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far.
    pub fn calls(&self) -> &[UiCall] {
        &self.calls
    }

    /// Forget the log.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Status changes in order.
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                UiCall::Status(status) => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    /// Feed updates in order.
    pub fn feed(&self) -> Vec<FeedEvent> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                UiCall::Feed(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Notification messages in order.
    pub fn notices(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                UiCall::Notice { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most recent conversation list redraw.
    pub fn last_list(&self) -> Option<&[(UserId, u32, bool)]> {
        self.calls.iter().rev().find_map(|call| match call {
            UiCall::ConversationList { rows, .. } => Some(rows.as_slice()),
            _ => None,
        })
    }

    /// Whether any recorded call matches.
    pub fn saw(&self, predicate: impl Fn(&UiCall) -> bool) -> bool {
        self.calls.iter().any(predicate)
    }
}

impl UiAdapter for RecordingAdapter {
    fn render_conversation_list(&mut self, conversations: &[&Conversation], active: Option<UserId>) {
        let rows = conversations.iter().map(|c| (c.peer_id, c.unread_count, c.is_online)).collect();
        self.calls.push(UiCall::ConversationList { rows, active });
    }

    fn render_messages(&mut self, conversation: &Conversation) {
        let ids = conversation.history().iter().map(|m| m.id).collect();
        self.calls.push(UiCall::Messages { peer: conversation.peer_id, ids });
    }

    fn render_typing(&mut self, peer: UserId, active: bool) {
        self.calls.push(UiCall::Typing { peer, active });
    }

    fn render_status(&mut self, status: &ConnectionStatus) {
        self.calls.push(UiCall::Status(status.clone()));
    }

    fn feed_update(&mut self, event: &FeedEvent) {
        self.calls.push(UiCall::Feed(event.clone()));
    }

    fn notify(&mut self, message: &str, code: Option<&str>) {
        self.calls.push(UiCall::Notice { message: message.to_string(), code: code.map(str::to_string) });
    }

    fn reconnection_failed(&mut self, attempts: u32) {
        self.calls.push(UiCall::ReconnectionFailed(attempts));
    }

    fn session_expired(&mut self) {
        self.calls.push(UiCall::SessionExpired);
    }
}
