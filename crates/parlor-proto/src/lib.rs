//! Wire protocol for the Parlor chat session.
//!
//! Every WebSocket frame is one JSON object:
//!
//! ```text
//! { "type": "<tag>", "data": <payload>, "timestamp": "<RFC 3339>" }
//! ```
//!
//! # Components
//!
//! - [`Envelope`]: the raw `{type, data, timestamp}` object
//! - [`InboundMessage`]: a decoded server push, one variant per known tag plus
//!   an explicit [`InboundBody::Unknown`] fallback
//! - [`MessageKind`] / [`OutboundKind`]: tag tables for both directions
//! - [`payloads`]: typed payloads for WebSocket frames and REST bodies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod kind;
pub mod payloads;

pub use envelope::{Envelope, InboundBody, InboundMessage};
pub use errors::ProtocolError;
pub use kind::{FeedKind, MessageKind, OutboundKind};
pub use payloads::{
    ChatMessage, ConversationSummary, FeedEvent, MarkReadRequest, MessageId, OnlineUsers,
    OutgoingMessage, OutgoingTyping, PresenceStatus, ServerError, TypingNotice, UserId,
    UserStatus, UserSummary,
};

/// Close code for a normal, client- or server-initiated closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code the client uses when the peer stopped answering heartbeats.
pub const CLOSE_LIVENESS_TIMEOUT: u16 = 4000;

/// Close code the client uses when the opening handshake took too long.
pub const CLOSE_CONNECT_TIMEOUT: u16 = 4001;
