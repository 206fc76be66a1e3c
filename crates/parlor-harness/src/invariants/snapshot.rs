//! Observable state snapshots for invariant checking.
//!
//! Invariants operate on snapshots rather than live state so a check sees
//! one consistent moment.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use parlor_client::Session;
use parlor_core::{ConnectionState, Environment};
use parlor_proto::{MessageId, UserId};

/// Snapshot of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Conversation on screen, if any.
    pub active: Option<UserId>,
    /// Whether the UI is visible.
    pub visible: bool,
    /// Presence set.
    pub online: BTreeSet<UserId>,
    /// Every conversation, in no particular order.
    pub conversations: Vec<ConversationSnapshot>,
    /// Connection state.
    pub connection: ConnectionState,
    /// Heartbeat timer armed.
    pub heartbeat_armed: bool,
    /// Backoff timer armed.
    pub backoff_armed: bool,
    /// Consecutive failed attempts.
    pub attempt: u32,
    /// Frames waiting in the outbound queue.
    pub queued: usize,
}

impl SessionSnapshot {
    /// Capture the observable state of `session`.
    pub fn capture<E: Environment>(session: &Session<E>) -> Self {
        let state = session.state();
        let connection = session.connection();

        Self {
            active: state.active(),
            visible: state.is_visible(),
            online: state.online_users().iter().copied().collect(),
            conversations: state.conversations().map(ConversationSnapshot::from).collect(),
            connection: connection.state(),
            heartbeat_armed: connection.heartbeat_armed(),
            backoff_armed: connection.backoff_armed(),
            attempt: connection.attempt(),
            queued: session.queue().len(),
        }
    }

    /// Conversation with `peer`, if any.
    pub fn conversation(&self, peer: UserId) -> Option<&ConversationSnapshot> {
        self.conversations.iter().find(|c| c.peer == peer)
    }
}

/// Snapshot of one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSnapshot {
    /// Peer.
    pub peer: UserId,
    /// Unread count.
    pub unread: u32,
    /// Presence flag on the conversation.
    pub is_online: bool,
    /// `(created_at, id)` of every history message, in stored order.
    pub history: Vec<(DateTime<Utc>, MessageId)>,
}

impl From<&parlor_client::Conversation> for ConversationSnapshot {
    fn from(conversation: &parlor_client::Conversation) -> Self {
        Self {
            peer: conversation.peer_id,
            unread: conversation.unread_count,
            is_online: conversation.is_online,
            history: conversation.history().iter().map(|m| (m.created_at, m.id)).collect(),
        }
    }
}
