//! REST sync bodies.
//!
//! These seed and refresh the conversation state in bulk; the WebSocket only
//! carries increments.

use serde::{Deserialize, Serialize};

use super::{ChatMessage, UserId};

/// One row of `GET /messages/conversations`.
///
/// Every field except the peer id is optional: a row only overrides what it
/// actually carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// The peer of this conversation.
    #[serde(alias = "peer_id")]
    pub user_id: UserId,
    /// Peer's display name.
    #[serde(default, alias = "display_name")]
    pub username: Option<String>,
    /// Most recent message in the conversation.
    #[serde(default)]
    pub last_message: Option<ChatMessage>,
    /// Server-side unread count.
    #[serde(default)]
    pub unread_count: Option<u32>,
    /// Server-side presence at snapshot time.
    #[serde(default)]
    pub is_online: Option<bool>,
}

impl ConversationSummary {
    /// Bare row for `user_id`.
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, username: None, last_message: None, unread_count: None, is_online: None }
    }
}

/// One row of `GET /messages/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Server-side presence at snapshot time, when included.
    #[serde(default)]
    pub is_online: Option<bool>,
}

/// Body of `POST /messages/mark-read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReadRequest {
    /// Peer whose messages are now read.
    pub user_id: UserId,
}
