//! Inbound message router.
//!
//! Parses raw frames and dispatches them by kind through a lookup table. One
//! handler per kind; registering again replaces the previous handler.
//! Malformed frames and unknown kinds are logged and dropped, never
//! propagated: a bad frame must not take the connection down.

use std::collections::HashMap;

use parlor_core::Moment;
use parlor_proto::{InboundBody, InboundMessage, MessageKind};

use crate::{event::SessionAction, state::ChatState};

/// Handler for one message kind.
pub type Handler<I> = fn(&mut ChatState<I>, InboundMessage, I) -> Vec<SessionAction<I>>;

/// Kind → handler table.
pub struct Router<I> {
    handlers: HashMap<MessageKind, Handler<I>>,
}

impl<I: Moment> Router<I> {
    /// Router with no handlers. Every frame is dropped.
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Router with the standard handler for every known kind.
    pub fn standard() -> Self {
        let mut router = Self::empty();
        router.register(MessageKind::PrivateMessage, on_private_message);
        router.register(MessageKind::UserStatus, on_user_status);
        router.register(MessageKind::OnlineUsers, on_online_users);
        router.register(MessageKind::Typing, on_typing);
        router.register(MessageKind::Error, on_error);
        router.register(MessageKind::Pong, on_pong);
        for kind in MessageKind::ALL {
            if kind.feed_kind().is_some() {
                router.register(kind, on_feed);
            }
        }
        router
    }

    /// Install `handler` for `kind`, returning the handler it replaced.
    pub fn register(&mut self, kind: MessageKind, handler: Handler<I>) -> Option<Handler<I>> {
        self.handlers.insert(kind, handler)
    }

    /// Remove the handler for `kind`.
    pub fn unregister(&mut self, kind: MessageKind) -> Option<Handler<I>> {
        self.handlers.remove(&kind)
    }

    /// Whether `kind` has a handler.
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Decode `raw` and run the handler for its kind.
    pub fn dispatch(&self, state: &mut ChatState<I>, raw: &str, now: I) -> Vec<SessionAction<I>> {
        let message = match InboundMessage::decode(raw) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, len = raw.len(), "dropping undecodable frame");
                return vec![];
            },
        };

        let Some(kind) = message.kind() else {
            if let InboundBody::Unknown { tag } = &message.body {
                tracing::warn!(%tag, "dropping frame with unknown type");
            }
            return vec![];
        };

        match self.handlers.get(&kind) {
            Some(handler) => handler(state, message, now),
            None => {
                tracing::debug!(%kind, "no handler registered, frame dropped");
                vec![]
            },
        }
    }
}

impl<I: Moment> Default for Router<I> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<I> std::fmt::Debug for Router<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        f.debug_struct("Router").field("kinds", &kinds).finish()
    }
}

fn on_private_message<I: Moment>(state: &mut ChatState<I>, message: InboundMessage, _now: I) -> Vec<SessionAction<I>> {
    match message.body {
        InboundBody::PrivateMessage(chat) => state.record_incoming(chat),
        other => mismatched(MessageKind::PrivateMessage, &other),
    }
}

fn on_user_status<I: Moment>(state: &mut ChatState<I>, message: InboundMessage, _now: I) -> Vec<SessionAction<I>> {
    match message.body {
        InboundBody::UserStatus(status) => state.apply_status(status.user_id, status.status),
        other => mismatched(MessageKind::UserStatus, &other),
    }
}

fn on_online_users<I: Moment>(state: &mut ChatState<I>, message: InboundMessage, _now: I) -> Vec<SessionAction<I>> {
    match message.body {
        InboundBody::OnlineUsers(online) => state.apply_presence_snapshot(online.user_ids),
        other => mismatched(MessageKind::OnlineUsers, &other),
    }
}

fn on_typing<I: Moment>(state: &mut ChatState<I>, message: InboundMessage, now: I) -> Vec<SessionAction<I>> {
    match message.body {
        InboundBody::Typing(notice) => state.note_typing(notice.user_id, notice.is_typing, now),
        other => mismatched(MessageKind::Typing, &other),
    }
}

fn on_feed<I: Moment>(_state: &mut ChatState<I>, message: InboundMessage, _now: I) -> Vec<SessionAction<I>> {
    match message.body {
        InboundBody::Feed(event) => {
            tracing::debug!(kind = ?event.kind, "feed update");
            vec![SessionAction::FeedUpdate(event)]
        },
        other => mismatched(MessageKind::PostCreated, &other),
    }
}

fn on_error<I: Moment>(_state: &mut ChatState<I>, message: InboundMessage, _now: I) -> Vec<SessionAction<I>> {
    match message.body {
        InboundBody::Error(error) => {
            tracing::warn!(reason = %error.message, code = ?error.code, "server reported an error");
            vec![SessionAction::Notify { message: error.message, code: error.code }]
        },
        other => mismatched(MessageKind::Error, &other),
    }
}

fn on_pong<I: Moment>(_state: &mut ChatState<I>, _message: InboundMessage, _now: I) -> Vec<SessionAction<I>> {
    tracing::trace!("pong");
    vec![]
}

fn mismatched<I>(kind: MessageKind, body: &InboundBody) -> Vec<SessionAction<I>> {
    tracing::warn!(%kind, ?body, "handler received a body of another kind");
    vec![]
}
