//! Session events and actions.

use parlor_core::{ConnectionStatus, OutboundFrame};
use parlor_proto::{ChatMessage, ConversationSummary, FeedEvent, UserId, UserSummary};
use url::Url;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Reporting socket lifecycle and inbound frames
/// - Driving time forward via ticks
/// - Forwarding UI intents (send, select, mark read)
/// - Delivering the outcome of REST requests the session asked for
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulated time.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent<I = std::time::Instant> {
    /// User asked to connect (also the explicit retry after giving up).
    Connect,

    /// User asked to disconnect.
    Disconnect,

    /// The socket requested by [`SessionAction::OpenSocket`] is open.
    SocketOpened,

    /// The socket closed.
    SocketClosed {
        /// Close code. `None` when the socket died without a close frame.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },

    /// The socket reported an error. A close report follows.
    SocketError {
        /// Error description.
        reason: String,
    },

    /// A text frame arrived.
    FrameReceived(String),

    /// Time tick for timer processing.
    ///
    /// The caller should send ticks periodically (once a second is plenty)
    /// so heartbeats, reconnects and typing expiry fire.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// User wants to send a chat message.
    SendMessage {
        /// Recipient.
        to: UserId,
        /// Message text.
        content: String,
    },

    /// User is typing to a peer.
    SendTyping {
        /// Peer to notify.
        to: UserId,
    },

    /// User opened a conversation.
    SelectConversation {
        /// Peer of the conversation.
        peer: UserId,
    },

    /// User navigated away from the active conversation.
    CloseConversation,

    /// User explicitly marked a conversation read.
    MarkRead {
        /// Peer of the conversation.
        peer: UserId,
    },

    /// UI became visible or hidden.
    SetVisible(bool),

    /// A REST request completed.
    SyncCompleted(SyncResponse),

    /// A REST request failed.
    SyncFailed {
        /// The request that failed.
        request: SyncRequest,
        /// Error description.
        error: String,
        /// The server rejected our credentials.
        unauthorized: bool,
    },

    /// Frames from [`SessionAction::Transmit`] that never reached the socket.
    Undelivered(Vec<OutboundFrame<I>>),
}

/// REST requests the session asks the caller to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    /// `GET /messages/conversations`
    Conversations,
    /// `GET /messages/history`
    History {
        /// Peer of the conversation.
        peer: UserId,
        /// Page size.
        limit: usize,
        /// Messages to skip, newest first.
        offset: usize,
    },
    /// `POST /messages/mark-read`
    MarkRead {
        /// Peer of the conversation.
        peer: UserId,
    },
    /// `GET /messages/users`
    Users,
}

/// Outcome of a [`SyncRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResponse {
    /// Conversation snapshot.
    Conversations(Vec<ConversationSummary>),
    /// One page of history.
    History {
        /// Peer of the conversation.
        peer: UserId,
        /// Messages in the page, any order.
        messages: Vec<ChatMessage>,
    },
    /// Server acknowledged a mark-read.
    MarkedRead {
        /// Peer of the conversation.
        peer: UserId,
    },
    /// User list.
    Users(Vec<UserSummary>),
}

/// Which part of the UI needs redrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The sorted conversation list (unread badges, presence dots).
    ConversationList,
    /// Message list of one conversation.
    Messages {
        /// Peer of the conversation.
        peer: UserId,
    },
    /// Typing indicator of one peer.
    Typing {
        /// Peer who is or was typing.
        peer: UserId,
        /// Whether the indicator is shown.
        active: bool,
    },
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction<I = std::time::Instant> {
    /// Open a WebSocket to `url`.
    OpenSocket {
        /// Endpoint with the auth token as query parameter.
        url: Url,
    },

    /// Send a text frame on the open socket.
    ///
    /// If the socket refuses it, hand `frame` back through
    /// [`SessionEvent::Undelivered`].
    Transmit {
        /// The queued frame this text encodes.
        frame: OutboundFrame<I>,
        /// Encoded envelope.
        text: String,
    },

    /// Close the socket.
    CloseSocket {
        /// WebSocket close code
        code: u16,
        /// Close reason
        reason: String,
    },

    /// Perform a REST request and report back.
    Sync(SyncRequest),

    /// Redraw part of the UI.
    Render(RenderTarget),

    /// Connection status changed.
    Status(ConnectionStatus),

    /// Post/comment feed update, forwarded untouched.
    FeedUpdate(FeedEvent),

    /// Non-fatal notification for the user.
    Notify {
        /// Human-readable description.
        message: String,
        /// Machine-readable code, if any.
        code: Option<String>,
    },

    /// Reconnect attempts are exhausted.
    ReconnectionFailed {
        /// Failed attempts before giving up.
        attempts: u32,
    },

    /// The server rejected our credentials.
    SessionExpired,
}
