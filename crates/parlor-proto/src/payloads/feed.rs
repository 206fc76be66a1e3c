//! Feed updates and server errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::FeedKind;

/// A post/comment feed update.
///
/// The payload belongs to the feed domain and is forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    /// Which feed change this is.
    pub kind: FeedKind,
    /// Untouched `data` field of the frame.
    pub data: Value,
}

/// Server-pushed application error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Human-readable description.
    pub message: String,
    /// Optional machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
