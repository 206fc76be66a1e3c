//! Session error types.

use parlor_core::ConnectionError;
use parlor_proto::ProtocolError;
use thiserror::Error;

/// Errors from [`crate::Session::handle`].
///
/// None of these are fatal: the runtime logs them and tells the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Connect requested without credentials.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Configured endpoint is not a usable WebSocket URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Refused to send an empty message.
    #[error("message is empty")]
    EmptyMessage,

    /// Connection state machine rejected a transition.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
