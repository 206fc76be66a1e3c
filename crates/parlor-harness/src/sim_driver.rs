//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` stands in for the tokio driver of the command-line client.
//! It implements [`Driver`] so the same [`parlor_app::Runtime`]
//! orchestration code runs in both production and simulation. Nothing
//! happens on its own: tests inject socket and sync outcomes and inspect
//! what the runtime asked for.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use parlor_app::Driver;
use parlor_client::{SessionEvent, SyncRequest};
use serde_json::Value;
use url::Url;

use crate::SimInstant;

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

#[derive(Default)]
struct SharedState {
    inbox: VecDeque<SessionEvent<SimInstant>>,
    opened: Vec<Url>,
    sent: Vec<String>,
    closed: Vec<(u16, String)>,
    fetches: Vec<SyncRequest>,
    socket: bool,
    refuse_sends: bool,
    refuse_opens: bool,
    unresponsive_closes: bool,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Clones share state, so a test keeps one handle while the runtime owns
/// another.
#[derive(Clone, Default)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
}

impl SimDriver {
    /// Create a new simulation driver.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an event for [`Driver::poll_event`].
    pub fn inject(&self, event: SessionEvent<SimInstant>) {
        self.lock().inbox.push_back(event);
    }

    /// Queue an inbound frame.
    pub fn inject_frame(&self, frame: &Value) {
        self.inject(SessionEvent::FrameReceived(frame.to_string()));
    }

    /// Take the next queued event.
    pub fn next_event(&self) -> Option<SessionEvent<SimInstant>> {
        self.lock().inbox.pop_front()
    }

    /// Check if there are queued events.
    pub fn has_pending(&self) -> bool {
        !self.lock().inbox.is_empty()
    }

    /// Make every subsequent send fail, as a socket that died silently.
    pub fn refuse_sends(&self, refuse: bool) {
        self.lock().refuse_sends = refuse;
    }

    /// Make every subsequent open fail before a socket exists.
    pub fn refuse_opens(&self, refuse: bool) {
        self.lock().refuse_opens = refuse;
    }

    /// Stop acknowledging closes, as a socket stuck mid-handshake or on a
    /// dead network.
    pub fn unresponsive_closes(&self, unresponsive: bool) {
        self.lock().unresponsive_closes = unresponsive;
    }

    /// Whether a socket was opened and not closed since.
    pub fn has_socket(&self) -> bool {
        self.lock().socket
    }

    /// URLs of every socket opened so far.
    pub fn opened(&self) -> Vec<Url> {
        self.lock().opened.clone()
    }

    /// Take all frames sent so far.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Take all frames sent so far, parsed.
    pub fn take_sent_json(&self) -> Vec<Value> {
        self.take_sent().iter().filter_map(|text| serde_json::from_str(text).ok()).collect()
    }

    /// Close codes and reasons the runtime asked for.
    pub fn closed(&self) -> Vec<(u16, String)> {
        self.lock().closed.clone()
    }

    /// Take all REST requests started so far.
    pub fn take_fetches(&self) -> Vec<SyncRequest> {
        std::mem::take(&mut self.lock().fetches)
    }

    /// Whether [`Driver::stop`] was called.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self) -> Result<Option<SessionEvent<SimInstant>>, Self::Error> {
        Ok(self.next_event())
    }

    fn open_socket(&mut self, url: &Url) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.refuse_opens {
            return Err(SimDriverError("connection refused".into()));
        }
        state.opened.push(url.clone());
        state.socket = true;
        Ok(())
    }

    fn send_text(&mut self, text: String) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if !state.socket {
            return Err(SimDriverError("no socket".into()));
        }
        if state.refuse_sends {
            return Err(SimDriverError("broken pipe".into()));
        }
        state.sent.push(text);
        Ok(())
    }

    fn close_socket(&mut self, code: u16, reason: &str) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if !state.socket {
            return Err(SimDriverError("no socket".into()));
        }
        state.socket = false;
        state.closed.push((code, reason.to_string()));
        if state.unresponsive_closes {
            return Ok(());
        }
        // The peer acknowledges our close.
        state.inbox.push_back(SessionEvent::SocketClosed { code: Some(code), reason: reason.to_string() });
        Ok(())
    }

    fn fetch(&mut self, request: SyncRequest) -> Result<(), Self::Error> {
        self.lock().fetches.push(request);
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.socket = false;
        state.stopped = true;
    }
}
