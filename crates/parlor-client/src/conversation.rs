//! Per-peer conversation record.

use std::cmp::Ordering;

use parlor_proto::{ChatMessage, UserId};

/// One-to-one conversation with a peer.
///
/// Created lazily on first reference and kept for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// The other participant.
    pub peer_id: UserId,
    /// Peer's display name, once known.
    pub display_name: Option<String>,
    /// Most recent message seen through any path.
    pub last_message: Option<ChatMessage>,
    /// Messages the peer sent that we have not read.
    pub unread_count: u32,
    /// Mirrors membership of the peer in the presence set.
    pub is_online: bool,
    history: Vec<ChatMessage>,
    history_loaded: bool,
}

impl Conversation {
    /// Empty conversation with `peer_id`.
    pub fn new(peer_id: UserId) -> Self {
        Self {
            peer_id,
            display_name: None,
            last_message: None,
            unread_count: 0,
            is_online: false,
            history: Vec::new(),
            history_loaded: false,
        }
    }

    /// Display name, falling back to the peer id.
    pub fn name(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| self.peer_id.to_string())
    }

    /// Messages ordered by `created_at` ascending.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// True once a REST history page has been merged.
    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }

    /// Insert a message, keeping `(created_at, id)` order.
    ///
    /// Returns `false` if a message with the same id is already present.
    pub fn insert_message(&mut self, message: ChatMessage) -> bool {
        if self.history.iter().any(|m| m.id == message.id) {
            return false;
        }

        let key = (message.created_at, message.id);
        let at = self.history.partition_point(|m| (m.created_at, m.id) <= key);
        self.history.insert(at, message);
        true
    }

    /// Merge a history page. Returns the number of new messages.
    pub fn merge_history(&mut self, messages: impl IntoIterator<Item = ChatMessage>) -> usize {
        let added = messages.into_iter().filter(|m| self.insert_message(m.clone())).count();
        self.history_loaded = true;
        added
    }

    /// Replace `last_message` if `candidate` is at least as fresh.
    ///
    /// Returns `true` if it was replaced.
    pub fn offer_last_message(&mut self, candidate: &ChatMessage) -> bool {
        let fresher = self.last_message.as_ref().is_none_or(|current| candidate.created_at >= current.created_at);
        if fresher {
            self.last_message = Some(candidate.clone());
        }
        fresher
    }

    /// Ordering for the conversation list.
    ///
    /// Conversations with a last message come first, newest first. The rest
    /// follow by name, with the peer id breaking ties.
    pub fn list_order(a: &Self, b: &Self) -> Ordering {
        match (&a.last_message, &b.last_message) {
            (Some(x), Some(y)) => y.created_at.cmp(&x.created_at).then(a.peer_id.cmp(&b.peer_id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.name().cmp(&b.name()).then(a.peer_id.cmp(&b.peer_id)),
        }
    }
}
