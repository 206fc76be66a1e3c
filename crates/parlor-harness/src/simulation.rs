//! One simulated client: runtime, virtual clock, scripted server.
//!
//! [`Simulation`] owns a [`Runtime`] wired to [`SimDriver`], [`SimEnv`] and
//! [`RecordingAdapter`]. Every helper delivers one event and then drains
//! whatever the driver queued in response (close acknowledgements), so a
//! test reads as a script of what the server and the user do.

use std::{sync::Arc, time::Duration};

use parlor_app::Runtime;
use parlor_client::{
    AuthProvider, Credentials, Session, SessionConfig, SessionError, SessionEvent, SyncRequest, SyncResponse,
};
use parlor_core::Environment;
use parlor_proto::UserId;
use serde_json::Value;

use crate::{InvariantRegistry, RecordingAdapter, SessionSnapshot, SimDriver, SimEnv, SimInstant, Violation};

/// Endpoint every simulation connects to.
pub const SIM_ENDPOINT: &str = "ws://parlor.test/ws";

/// Token every simulation authenticates with.
pub const SIM_TOKEN: &str = "sim-token";

/// A single client session under simulation.
pub struct Simulation {
    env: SimEnv,
    driver: SimDriver,
    runtime: Runtime<SimDriver, SimEnv, RecordingAdapter>,
    invariants: InvariantRegistry,
}

impl Simulation {
    /// Session for `user_id` with default configuration.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidEndpoint` if [`SIM_ENDPOINT`] does not parse
    pub fn new(user_id: UserId) -> Result<Self, SessionError> {
        let config = SessionConfig::new(SIM_ENDPOINT)?;
        Ok(Self::with_config(config, Arc::new(Credentials::new(user_id, SIM_TOKEN))))
    }

    /// Session with explicit configuration and credentials.
    pub fn with_config(config: SessionConfig, auth: Arc<dyn AuthProvider>) -> Self {
        let env = SimEnv::new();
        let driver = SimDriver::new();
        let session = Session::new(env.clone(), auth, config);
        let runtime = Runtime::new(driver.clone(), session, RecordingAdapter::new());
        Self { env, driver, runtime, invariants: InvariantRegistry::standard() }
    }

    /// Virtual clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Driver handle, for injecting failures and inspecting traffic.
    pub fn driver(&self) -> &SimDriver {
        &self.driver
    }

    /// The session under test.
    pub fn session(&self) -> &Session<SimEnv> {
        self.runtime.session()
    }

    /// Everything rendered so far.
    pub fn ui(&self) -> &RecordingAdapter {
        self.runtime.ui()
    }

    /// Deliver one event, then everything the driver queued meanwhile.
    pub fn step(&mut self, event: SessionEvent<SimInstant>) {
        self.runtime.step(event);
        while let Some(event) = self.driver.next_event() {
            self.runtime.step(event);
        }
    }

    /// User asks to connect.
    pub fn connect(&mut self) {
        self.step(SessionEvent::Connect);
    }

    /// The pending socket opens.
    pub fn open(&mut self) {
        self.step(SessionEvent::SocketOpened);
    }

    /// Connect and open in one go.
    pub fn connect_and_open(&mut self) {
        self.connect();
        self.open();
    }

    /// The server pushes `frame`.
    pub fn push(&mut self, frame: &Value) {
        self.step(SessionEvent::FrameReceived(frame.to_string()));
    }

    /// The socket drops with `code` (or without a close frame).
    pub fn drop_socket(&mut self, code: Option<u16>, reason: &str) {
        self.step(SessionEvent::SocketClosed { code, reason: reason.to_string() });
    }

    /// Move the clock and tick.
    pub fn advance(&mut self, by: Duration) {
        self.env.advance(by);
        let now = self.env.now();
        self.step(SessionEvent::Tick { now });
    }

    /// Complete a REST request.
    pub fn respond(&mut self, response: SyncResponse) {
        self.step(SessionEvent::SyncCompleted(response));
    }

    /// Fail a REST request.
    pub fn fail_sync(&mut self, request: SyncRequest, unauthorized: bool) {
        let error = if unauthorized { "HTTP 401" } else { "HTTP 503" };
        self.step(SessionEvent::SyncFailed { request, error: error.to_string(), unauthorized });
    }

    /// Snapshot of the session's observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self.runtime.session())
    }

    /// Run the standard invariants against the current state.
    pub fn check(&self) -> Result<(), Vec<Violation>> {
        self.invariants.check_all(&self.snapshot())
    }

    /// Give the runtime back, for [`Runtime::run`].
    pub fn into_runtime(self) -> Runtime<SimDriver, SimEnv, RecordingAdapter> {
        self.runtime
    }
}

#[cfg(test)]
mod tests {
    use parlor_core::ConnectionState;

    use super::*;

    #[test]
    fn fresh_simulation_is_idle_and_consistent() {
        let sim = Simulation::new(7).unwrap();

        assert_eq!(sim.session().connection().state(), ConnectionState::Idle);
        assert!(sim.driver().opened().is_empty());
        assert!(sim.check().is_ok());
    }

    #[test]
    fn connect_uses_the_simulated_endpoint() {
        let mut sim = Simulation::new(7).unwrap();
        sim.connect();

        let opened = sim.driver().opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].as_str(), format!("{SIM_ENDPOINT}?token={SIM_TOKEN}"));
    }
}
