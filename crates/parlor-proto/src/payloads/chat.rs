//! Chat message payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, UserId};

/// A stored one-to-one chat message.
///
/// Immutable once the server assigned its `id`. The same shape is used for
/// `private_message` pushes and for REST history pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned id.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Message text.
    pub content: String,
    /// Server timestamp; orders a conversation's history.
    pub created_at: DateTime<Utc>,
    /// Author's display name, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

impl ChatMessage {
    /// The other participant from the point of view of `me`.
    ///
    /// Without a known local user every message is treated as incoming.
    pub fn peer_of(&self, me: Option<UserId>) -> UserId {
        match me {
            Some(me) if self.sender_id == me => self.receiver_id,
            _ => self.sender_id,
        }
    }

    /// True if `me` wrote this message.
    pub fn is_from(&self, me: Option<UserId>) -> bool {
        me == Some(self.sender_id)
    }
}

/// Outbound `private_message` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Recipient.
    pub receiver_id: UserId,
    /// Message text.
    pub content: String,
}

/// Inbound `typing` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingNotice {
    /// Peer who is typing.
    pub user_id: UserId,
    /// `false` clears the indicator early. Absent means typing.
    #[serde(default = "typing_default")]
    pub is_typing: bool,
}

fn typing_default() -> bool {
    true
}

/// Outbound `typing` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingTyping {
    /// Peer to notify.
    pub receiver_id: UserId,
}
