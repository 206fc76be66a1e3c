//! Message kind tags.
//!
//! Tags are resolved through static tables rather than string matches spread
//! over the codebase. Unknown inbound tags resolve to `None` and are carried
//! as [`crate::InboundBody::Unknown`].

use serde::{Deserialize, Serialize};

/// Kinds of frames the server pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    /// A one-to-one chat message (incoming, or the echo of our own send).
    PrivateMessage,
    /// A single user went online or offline.
    UserStatus,
    /// Full list of online users.
    OnlineUsers,
    /// A peer is typing.
    Typing,
    /// Feed: a post was created.
    PostCreated,
    /// Feed: a comment was added.
    CommentAdded,
    /// Feed: a comment was edited.
    CommentUpdated,
    /// Feed: a comment was deleted.
    CommentDeleted,
    /// Feed: reactions on a post changed.
    PostReactionsUpdated,
    /// Server-side application error.
    Error,
    /// Heartbeat reply.
    Pong,
}

const INBOUND_TAGS: [(&str, MessageKind); 11] = [
    ("private_message", MessageKind::PrivateMessage),
    ("user_status", MessageKind::UserStatus),
    ("online_users", MessageKind::OnlineUsers),
    ("typing", MessageKind::Typing),
    ("post_created", MessageKind::PostCreated),
    ("comment_added", MessageKind::CommentAdded),
    ("comment_updated", MessageKind::CommentUpdated),
    ("comment_deleted", MessageKind::CommentDeleted),
    ("post_reactions_updated", MessageKind::PostReactionsUpdated),
    ("error", MessageKind::Error),
    ("pong", MessageKind::Pong),
];

impl MessageKind {
    /// Every inbound kind, in table order.
    pub const ALL: [MessageKind; 11] = [
        MessageKind::PrivateMessage,
        MessageKind::UserStatus,
        MessageKind::OnlineUsers,
        MessageKind::Typing,
        MessageKind::PostCreated,
        MessageKind::CommentAdded,
        MessageKind::CommentUpdated,
        MessageKind::CommentDeleted,
        MessageKind::PostReactionsUpdated,
        MessageKind::Error,
        MessageKind::Pong,
    ];

    /// Resolve a wire tag. `None` for tags this client does not know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        INBOUND_TAGS.iter().find(|(t, _)| *t == tag).map(|(_, kind)| *kind)
    }

    /// Wire tag for this kind.
    pub fn as_tag(self) -> &'static str {
        INBOUND_TAGS.iter().find(|(_, k)| *k == self).map_or("unknown", |(tag, _)| tag)
    }

    /// Feed kind if this frame targets the post/comment feed.
    pub fn feed_kind(self) -> Option<FeedKind> {
        match self {
            Self::PostCreated => Some(FeedKind::PostCreated),
            Self::CommentAdded => Some(FeedKind::CommentAdded),
            Self::CommentUpdated => Some(FeedKind::CommentUpdated),
            Self::CommentDeleted => Some(FeedKind::CommentDeleted),
            Self::PostReactionsUpdated => Some(FeedKind::PostReactionsUpdated),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Feed update kinds forwarded untouched to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// A post was created.
    PostCreated,
    /// A comment was added.
    CommentAdded,
    /// A comment was edited.
    CommentUpdated,
    /// A comment was deleted.
    CommentDeleted,
    /// Reactions on a post changed.
    PostReactionsUpdated,
}

/// Kinds of frames the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundKind {
    /// Send a chat message.
    PrivateMessage,
    /// Tell a peer we are typing.
    Typing,
    /// Heartbeat.
    Ping,
}

impl OutboundKind {
    /// Wire tag for this kind.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::PrivateMessage => "private_message",
            Self::Typing => "typing",
            Self::Ping => "ping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_inbound_kind_round_trips_through_its_tag() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_tag(kind.as_tag()), Some(kind));
        }
    }

    #[test]
    fn unknown_tags_do_not_resolve() {
        assert_eq!(MessageKind::from_tag("friend_request"), None);
        assert_eq!(MessageKind::from_tag(""), None);
        assert_eq!(MessageKind::from_tag("PRIVATE_MESSAGE"), None);
    }

    #[test]
    fn only_feed_tags_have_a_feed_kind() {
        let feed: Vec<_> = MessageKind::ALL.into_iter().filter_map(MessageKind::feed_kind).collect();
        assert_eq!(feed.len(), 5);
        assert_eq!(MessageKind::PrivateMessage.feed_kind(), None);
        assert_eq!(MessageKind::Error.feed_kind(), None);
    }
}
