//! Chat session.
//!
//! The [`Session`] owns the connection state machine, the outbound queue,
//! the router and the chat state, and is the only thing the runtime talks
//! to. It is constructed explicitly with its collaborators: an environment
//! for time and an [`AuthProvider`] for credentials.
//!
//! Like everything below it, the session performs no I/O. Each
//! [`SessionEvent`] yields a list of [`SessionAction`]s, executed by the
//! caller in order.

use std::sync::Arc;

use parlor_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, Environment, OutboundFrame,
    OutboundQueue, QueueConfig,
};
use parlor_proto::{Envelope, OutboundKind, OutgoingMessage, OutgoingTyping, ProtocolError, UserId};
use serde_json::Value;
use url::Url;

use crate::{
    auth::{self, AuthProvider},
    error::SessionError,
    event::{SessionAction, SessionEvent, SyncRequest, SyncResponse},
    router::Router,
    state::{ChatState, StateConfig},
};

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Socket endpoint without token.
    pub endpoint: Url,
    /// Reconnect, heartbeat and timeouts.
    pub connection: ConnectionConfig,
    /// Outbound queue bounds.
    pub queue: QueueConfig,
    /// Typing window and history paging.
    pub state: StateConfig,
}

impl SessionConfig {
    /// Defaults for `endpoint`, normalised with [`auth::socket_endpoint`].
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidEndpoint` if `endpoint` is not usable
    pub fn new(endpoint: &str) -> Result<Self, SessionError> {
        Ok(Self {
            endpoint: auth::socket_endpoint(endpoint)?,
            connection: ConnectionConfig::default(),
            queue: QueueConfig::default(),
            state: StateConfig::default(),
        })
    }
}

/// Client-side chat session.
pub struct Session<E: Environment> {
    env: E,
    auth: Arc<dyn AuthProvider>,
    endpoint: Url,
    connection: Connection<E::Instant>,
    queue: OutboundQueue<E::Instant>,
    router: Router<E::Instant>,
    state: ChatState<E::Instant>,
}

impl<E: Environment> Session<E> {
    /// Create a disconnected session with the standard router.
    pub fn new(env: E, auth: Arc<dyn AuthProvider>, config: SessionConfig) -> Self {
        let SessionConfig { endpoint, connection, queue, state } = config;
        Self {
            env,
            auth,
            endpoint,
            connection: Connection::new(connection),
            queue: OutboundQueue::new(queue),
            router: Router::standard(),
            state: ChatState::new(state),
        }
    }

    /// Conversation and presence state.
    pub fn state(&self) -> &ChatState<E::Instant> {
        &self.state
    }

    /// Connection state machine.
    pub fn connection(&self) -> &Connection<E::Instant> {
        &self.connection
    }

    /// Frames waiting for the socket.
    pub fn queue(&self) -> &OutboundQueue<E::Instant> {
        &self.queue
    }

    /// Router, for installing custom handlers.
    pub fn router_mut(&mut self) -> &mut Router<E::Instant> {
        &mut self.router
    }

    /// Environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Process an event and return resulting actions.
    pub fn handle(
        &mut self,
        event: SessionEvent<E::Instant>,
    ) -> Result<Vec<SessionAction<E::Instant>>, SessionError> {
        let now = self.env.now();
        match event {
            SessionEvent::Connect => self.handle_connect(now),
            SessionEvent::Disconnect => {
                let actions = self.connection.disconnect(now);
                Ok(self.translate(actions, now))
            },
            SessionEvent::SocketOpened => match self.handle_opened(now) {
                // The attempt was cancelled or timed out meanwhile; its close follows.
                Err(SessionError::Connection(e)) => {
                    tracing::debug!(error = %e, "late open ignored");
                    Ok(vec![])
                },
                result => result,
            },
            SessionEvent::SocketClosed { code, reason } => Ok(self.handle_closed(code, &reason, now)),
            SessionEvent::SocketError { reason } => {
                self.connection.record_error(&reason);
                Ok(vec![])
            },
            SessionEvent::FrameReceived(raw) => {
                self.connection.handle_activity(now);
                Ok(self.router.dispatch(&mut self.state, &raw, now))
            },
            SessionEvent::Tick { now } => Ok(self.handle_tick(now)),
            SessionEvent::SendMessage { to, content } => self.handle_send_message(to, content, now),
            SessionEvent::SendTyping { to } => self.handle_send_typing(to, now),
            SessionEvent::SelectConversation { peer } => Ok(self.state.select_conversation(peer)),
            SessionEvent::CloseConversation => Ok(self.state.close_conversation()),
            SessionEvent::MarkRead { peer } => Ok(self.state.mark_read(peer)),
            SessionEvent::SetVisible(visible) => Ok(self.state.set_visible(visible)),
            SessionEvent::SyncCompleted(response) => Ok(self.apply_sync(response)),
            SessionEvent::SyncFailed { request, error, unauthorized } => {
                Ok(self.handle_sync_failed(request, &error, unauthorized, now))
            },
            SessionEvent::Undelivered(frames) => {
                tracing::debug!(count = frames.len(), "requeueing undelivered frames");
                self.queue.requeue_front(frames);
                Ok(vec![])
            },
        }
    }

    fn handle_connect(&mut self, now: E::Instant) -> Result<Vec<SessionAction<E::Instant>>, SessionError> {
        if self.auth.credentials().is_none() {
            return Err(SessionError::NotAuthenticated);
        }
        let actions = self.connection.connect(now);
        Ok(self.translate(actions, now))
    }

    fn handle_opened(&mut self, now: E::Instant) -> Result<Vec<SessionAction<E::Instant>>, SessionError> {
        let actions = self.connection.handle_opened(now)?;
        let mut out = self.translate(actions, now);

        out.extend(self.flush(now)?);

        // The socket only carries increments; catch up on what we missed.
        out.push(SessionAction::Sync(SyncRequest::Conversations));
        out.push(SessionAction::Sync(SyncRequest::Users));
        if let Some(peer) = self.state.active()
            && self.state.conversation(peer).is_some_and(|c| !c.history_loaded())
        {
            let limit = self.state.config().history_page;
            out.push(SessionAction::Sync(SyncRequest::History { peer, limit, offset: 0 }));
        }
        Ok(out)
    }

    fn handle_closed(&mut self, code: Option<u16>, reason: &str, now: E::Instant) -> Vec<SessionAction<E::Instant>> {
        let actions = self.connection.handle_closed(code, reason, now);
        if actions.is_empty() {
            return vec![];
        }

        let mut out = self.translate(actions, now);
        out.extend(self.state.clear_presence());
        out
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<SessionAction<E::Instant>> {
        let was_closing = self.connection.state() == ConnectionState::Closing;
        let actions = self.connection.tick(now);
        let mut out = self.translate(actions, now);

        // An unconfirmed close counts as closed.
        if was_closing && self.connection.state() != ConnectionState::Closing {
            out.extend(self.state.clear_presence());
        }
        out.extend(self.state.expire_typing(now));
        out
    }

    fn handle_send_message(
        &mut self,
        to: UserId,
        content: String,
        now: E::Instant,
    ) -> Result<Vec<SessionAction<E::Instant>>, SessionError> {
        if content.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let mut out = self.state.record_outgoing(to);
        let payload = encode_payload(&OutgoingMessage { receiver_id: to, content })?;
        self.queue.enqueue(OutboundFrame::new(OutboundKind::PrivateMessage, payload, now));

        if self.connection.is_open() {
            out.extend(self.flush(now)?);
        } else {
            tracing::debug!(to, queued = self.queue.len(), "not connected, message queued");
        }
        Ok(out)
    }

    /// Typing hints are only worth anything right now: never queued.
    fn handle_send_typing(&mut self, to: UserId, now: E::Instant) -> Result<Vec<SessionAction<E::Instant>>, SessionError> {
        if !self.connection.is_open() {
            return Ok(vec![]);
        }
        let payload = encode_payload(&OutgoingTyping { receiver_id: to })?;
        let frame = OutboundFrame::new(OutboundKind::Typing, payload, now);
        Ok(vec![self.transmit(frame)?])
    }

    fn handle_sync_failed(
        &mut self,
        request: SyncRequest,
        error: &str,
        unauthorized: bool,
        now: E::Instant,
    ) -> Vec<SessionAction<E::Instant>> {
        if unauthorized {
            tracing::warn!(?request, "credentials rejected, closing session");
            let mut out = vec![SessionAction::SessionExpired];
            let actions = self.connection.disconnect(now);
            out.extend(self.translate(actions, now));
            return out;
        }

        tracing::warn!(?request, %error, "sync request failed");
        vec![SessionAction::Notify { message: format!("could not refresh: {error}"), code: None }]
    }

    fn apply_sync(&mut self, response: SyncResponse) -> Vec<SessionAction<E::Instant>> {
        match response {
            SyncResponse::Conversations(rows) => self.state.merge_conversation_snapshot(rows),
            SyncResponse::History { peer, messages } => self.state.apply_history(peer, messages),
            SyncResponse::MarkedRead { peer } => {
                tracing::debug!(peer, "server acknowledged mark-read");
                vec![]
            },
            SyncResponse::Users(users) => self.state.apply_users(users),
        }
    }

    /// Execute connection actions that need session context (credentials,
    /// encoding) and pass the rest through.
    fn translate(&mut self, actions: Vec<ConnectionAction>, now: E::Instant) -> Vec<SessionAction<E::Instant>> {
        let mut out = Vec::new();

        for action in actions {
            match action {
                ConnectionAction::OpenSocket => match self.auth.credentials() {
                    Some(credentials) => {
                        self.state.set_self_id(credentials.user_id);
                        let url = auth::socket_url(&self.endpoint, &credentials.token);
                        out.push(SessionAction::OpenSocket { url });
                    },
                    None => {
                        tracing::warn!("no credentials, abandoning connect attempt");
                        let abandoned = self.connection.abandon();
                        out.extend(self.translate(abandoned, now));
                    },
                },
                ConnectionAction::SendPing => {
                    match self.transmit(OutboundFrame::new(OutboundKind::Ping, Value::Null, now)) {
                        Ok(transmit) => out.push(transmit),
                        Err(error) => tracing::warn!(%error, "failed to encode ping"),
                    }
                },
                ConnectionAction::CloseSocket { code, reason } => {
                    out.push(SessionAction::CloseSocket { code, reason });
                },
                ConnectionAction::Status(status) => out.push(SessionAction::Status(status)),
                ConnectionAction::GaveUp { attempts } => {
                    out.push(SessionAction::ReconnectionFailed { attempts });
                },
            }
        }

        out
    }

    /// Hand every queued frame to the socket, oldest first.
    fn flush(&mut self, now: E::Instant) -> Result<Vec<SessionAction<E::Instant>>, SessionError> {
        let sent_at = self.env.wall_clock();
        let mut out = Vec::new();

        let count = self.queue.flush(now, |frame| {
            let text = Envelope::outbound(frame.kind, frame.payload.clone(), sent_at).encode()?;
            out.push(SessionAction::Transmit { frame: frame.clone(), text });
            Ok::<_, ProtocolError>(())
        })?;

        if count > 0 {
            tracing::debug!(count, "flushed outbound queue");
        }
        Ok(out)
    }

    fn transmit(&self, frame: OutboundFrame<E::Instant>) -> Result<SessionAction<E::Instant>, SessionError> {
        let text = Envelope::outbound(frame.kind, frame.payload.clone(), self.env.wall_clock()).encode()?;
        Ok(SessionAction::Transmit { frame, text })
    }
}

fn encode_payload<T: serde::Serialize>(payload: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(payload).map_err(|e| ProtocolError::Encode(e.to_string()))
}

impl<E: Environment> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint.as_str())
            .field("connection", &self.connection.state())
            .field("queued", &self.queue.len())
            .field("conversations", &self.state.conversations().count())
            .finish_non_exhaustive()
    }
}
