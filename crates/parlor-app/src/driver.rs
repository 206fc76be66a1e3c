//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the runtime from specific I/O
//! implementations. The command-line client implements it with
//! tokio-tungstenite and reqwest; the simulation harness implements it in
//! memory. The generic [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use parlor_client::{SessionEvent, SyncRequest};
use parlor_core::Moment;
use url::Url;

/// Abstracts I/O operations for the runtime.
///
/// Every operation that has an outcome (opening a socket, a REST request)
/// only starts it; the outcome comes back later through
/// [`Driver::poll_event`]. The driver also generates periodic
/// [`SessionEvent::Tick`]s.
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Moment;

    /// Wait for the next event.
    ///
    /// Returns `None` when the driver is shutting down.
    fn poll_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<SessionEvent<Self::Instant>>, Self::Error>> + Send;

    /// Start opening a socket. Replaces any previous socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started.
    fn open_socket(&mut self, url: &Url) -> Result<(), Self::Error>;

    /// Send a text frame on the current socket.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no open socket or it refused the frame.
    fn send_text(&mut self, text: String) -> Result<(), Self::Error>;

    /// Close the current socket.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no socket.
    fn close_socket(&mut self, code: u16, reason: &str) -> Result<(), Self::Error>;

    /// Start a REST request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be started.
    fn fetch(&mut self, request: SyncRequest) -> Result<(), Self::Error>;

    /// Release all resources.
    fn stop(&mut self);
}
