//! Typed payloads.
//!
//! - [`chat`]: chat messages and typing notices
//! - [`presence`]: online/offline snapshots and deltas
//! - [`feed`]: opaque post/comment feed updates and server errors
//! - [`rest`]: bodies of the REST sync endpoints

pub mod chat;
pub mod feed;
pub mod presence;
pub mod rest;

pub use chat::{ChatMessage, OutgoingMessage, OutgoingTyping, TypingNotice};
pub use feed::{FeedEvent, ServerError};
pub use presence::{OnlineUsers, PresenceStatus, UserStatus};
pub use rest::{ConversationSummary, MarkReadRequest, UserSummary};

/// Server-assigned user identifier.
pub type UserId = u64;

/// Server-assigned message identifier.
pub type MessageId = u64;
