//! Error types for the connection layer.
//!
//! Socket failures are not errors here: they are events that drive the
//! reconnect logic. What remains are misuse of the state machine, which the
//! session logs and otherwise ignores.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors from connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Transition not valid from the current state (e.g. a late "opened"
    /// report for a socket we already gave up on).
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_the_operation() {
        let err = ConnectionError::InvalidState {
            state: ConnectionState::Closed,
            operation: "handle_opened",
        };
        assert_eq!(err.to_string(), "invalid state transition: cannot handle_opened from Closed");
    }
}
