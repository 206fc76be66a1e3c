//! Generic runtime for session orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`Session`]: chat session state machine
//! - [`Driver`]: Platform-specific I/O
//! - [`UiAdapter`]: rendering
//!
//! One event is processed at a time. The session finishes mutating state
//! before any of its actions is executed, so renders always see a
//! consistent view.

use std::collections::VecDeque;

use parlor_client::{RenderTarget, Session, SessionAction, SessionEvent};
use parlor_core::Environment;

use crate::{Driver, UiAdapter};

/// Generic runtime that orchestrates Session, Driver and UI.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment supplying time to the session
/// - `U`: UI adapter
pub struct Runtime<D, E, U>
where
    D: Driver,
    E: Environment,
    U: UiAdapter,
{
    driver: D,
    session: Session<E>,
    ui: U,
}

impl<D, E, U> Runtime<D, E, U>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
    U: UiAdapter,
{
    /// Create a new runtime.
    pub fn new(driver: D, session: Session<E>, ui: U) -> Self {
        Self { driver, session, ui }
    }

    /// Run the main event loop until the driver shuts down.
    ///
    /// Connects first, then feeds every driver event to the session. On
    /// shutdown the session disconnects cleanly.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot produce events anymore.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.step(SessionEvent::Connect);

        while let Some(event) = self.driver.poll_event().await? {
            self.step(event);
        }

        self.step(SessionEvent::Disconnect);
        self.driver.stop();
        Ok(())
    }

    /// Feed one event to the session and execute everything it produces.
    ///
    /// Driver failures are turned back into session events (undelivered
    /// frames, failed sockets, failed syncs) and processed before returning.
    pub fn step(&mut self, event: SessionEvent<E::Instant>) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            match self.session.handle(event) {
                Ok(actions) => self.execute(actions, &mut pending),
                Err(e) => {
                    tracing::warn!(error = %e, "session rejected event");
                    self.ui.notify(&e.to_string(), None);
                },
            }
        }
    }

    fn execute(
        &mut self,
        actions: Vec<SessionAction<E::Instant>>,
        pending: &mut VecDeque<SessionEvent<E::Instant>>,
    ) {
        let mut undelivered = Vec::new();

        for action in actions {
            match action {
                SessionAction::OpenSocket { url } => {
                    if let Err(e) = self.driver.open_socket(&url) {
                        tracing::warn!(error = %e, "failed to start socket");
                        pending.push_back(SessionEvent::SocketError { reason: e.to_string() });
                        pending.push_back(SessionEvent::SocketClosed { code: None, reason: e.to_string() });
                    }
                },
                SessionAction::Transmit { frame, text } => {
                    // Once one frame fails the rest of the batch would arrive
                    // out of order; hand them all back.
                    if !undelivered.is_empty() {
                        undelivered.push(frame);
                    } else if let Err(e) = self.driver.send_text(text) {
                        tracing::warn!(error = %e, kind = frame.kind.as_tag(), "send failed");
                        undelivered.push(frame);
                    }
                },
                SessionAction::CloseSocket { code, reason } => {
                    if let Err(e) = self.driver.close_socket(code, &reason) {
                        tracing::debug!(error = %e, "close on missing socket");
                    }
                },
                SessionAction::Sync(request) => {
                    if let Err(e) = self.driver.fetch(request) {
                        pending.push_back(SessionEvent::SyncFailed {
                            request,
                            error: e.to_string(),
                            unauthorized: false,
                        });
                    }
                },
                SessionAction::Render(target) => self.render(target),
                SessionAction::Status(status) => self.ui.render_status(&status),
                SessionAction::FeedUpdate(event) => self.ui.feed_update(&event),
                SessionAction::Notify { message, code } => self.ui.notify(&message, code.as_deref()),
                SessionAction::ReconnectionFailed { attempts } => self.ui.reconnection_failed(attempts),
                SessionAction::SessionExpired => self.ui.session_expired(),
            }
        }

        if !undelivered.is_empty() {
            pending.push_back(SessionEvent::Undelivered(undelivered));
        }
    }

    fn render(&mut self, target: RenderTarget) {
        let state = self.session.state();
        match target {
            RenderTarget::ConversationList => {
                self.ui.render_conversation_list(&state.sorted_conversations(), state.active());
            },
            RenderTarget::Messages { peer } => {
                if let Some(conversation) = state.conversation(peer) {
                    self.ui.render_messages(conversation);
                }
            },
            RenderTarget::Typing { peer, active } => self.ui.render_typing(peer, active),
        }
    }

    /// Get a reference to the session.
    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    /// Get a reference to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Get a reference to the UI adapter.
    pub fn ui(&self) -> &U {
        &self.ui
    }
}
