//! Protocol errors.

use thiserror::Error;

/// Errors produced while decoding or encoding frames.
///
/// None of these are fatal to a connection: the session logs them and drops
/// the offending frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not a JSON object with a string `type` field.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The tag is known but `data` does not match its payload shape.
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload {
        /// Wire tag of the frame
        kind: &'static str,
        /// Decoder message
        reason: String,
    },

    /// Serializing an outbound frame failed.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
