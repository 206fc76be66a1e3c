//! Frame envelope and inbound decoding.
//!
//! Decoding is two-step: the text is parsed into an [`Envelope`], then the
//! tag is resolved through [`MessageKind::from_tag`] and `data` is decoded
//! into the payload type of that kind. Unknown tags are not an error; they
//! decode to [`InboundBody::Unknown`] so the router can log and drop them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    errors::ProtocolError,
    kind::{MessageKind, OutboundKind},
    payloads::{ChatMessage, FeedEvent, OnlineUsers, ServerError, TypingNotice, UserStatus},
};

/// One JSON frame: `{type, data, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind tag.
    #[serde(rename = "type")]
    pub tag: String,
    /// Kind-specific payload. `null` when absent.
    #[serde(default)]
    pub data: Value,
    /// Sender's wall-clock time. Unparseable values decode as `None`.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Envelope {
    /// Build an outbound envelope.
    pub fn outbound(kind: OutboundKind, data: Value, timestamp: DateTime<Utc>) -> Self {
        Self { tag: kind.as_tag().to_string(), data, timestamp: Some(timestamp) }
    }

    /// Parse frame text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the text is not a JSON object with a
    ///   string `type`
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to frame text.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

/// Decoded body of a server push.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundBody {
    /// `private_message`
    PrivateMessage(ChatMessage),
    /// `user_status`
    UserStatus(UserStatus),
    /// `online_users`
    OnlineUsers(OnlineUsers),
    /// `typing`
    Typing(TypingNotice),
    /// One of the five feed tags.
    Feed(FeedEvent),
    /// `error`
    Error(ServerError),
    /// `pong`
    Pong,
    /// A tag this client does not know.
    Unknown {
        /// The unrecognised tag.
        tag: String,
    },
}

/// A decoded server push.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Kind-specific body.
    pub body: InboundBody,
    /// Server wall-clock time from the envelope.
    pub timestamp: Option<DateTime<Utc>>,
}

impl InboundMessage {
    /// Decode frame text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the envelope cannot be parsed
    /// - `ProtocolError::InvalidPayload` if a known tag carries the wrong shape
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::from_envelope(Envelope::decode(text)?)
    }

    /// Decode the payload of an already parsed envelope.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope { tag, data, timestamp } = envelope;

        let Some(kind) = MessageKind::from_tag(&tag) else {
            return Ok(Self { body: InboundBody::Unknown { tag }, timestamp });
        };

        let body = match kind {
            MessageKind::PrivateMessage => InboundBody::PrivateMessage(payload(kind, data)?),
            MessageKind::UserStatus => InboundBody::UserStatus(payload(kind, data)?),
            MessageKind::OnlineUsers => InboundBody::OnlineUsers(payload(kind, data)?),
            MessageKind::Typing => InboundBody::Typing(payload(kind, data)?),
            MessageKind::Error => InboundBody::Error(payload(kind, data)?),
            MessageKind::Pong => InboundBody::Pong,
            MessageKind::PostCreated
            | MessageKind::CommentAdded
            | MessageKind::CommentUpdated
            | MessageKind::CommentDeleted
            | MessageKind::PostReactionsUpdated => match kind.feed_kind() {
                Some(feed) => InboundBody::Feed(FeedEvent { kind: feed, data }),
                None => InboundBody::Unknown { tag },
            },
        };

        Ok(Self { body, timestamp })
    }

    /// Kind of this message. `None` for unknown tags.
    pub fn kind(&self) -> Option<MessageKind> {
        match &self.body {
            InboundBody::PrivateMessage(_) => Some(MessageKind::PrivateMessage),
            InboundBody::UserStatus(_) => Some(MessageKind::UserStatus),
            InboundBody::OnlineUsers(_) => Some(MessageKind::OnlineUsers),
            InboundBody::Typing(_) => Some(MessageKind::Typing),
            InboundBody::Feed(event) => Some(match event.kind {
                crate::FeedKind::PostCreated => MessageKind::PostCreated,
                crate::FeedKind::CommentAdded => MessageKind::CommentAdded,
                crate::FeedKind::CommentUpdated => MessageKind::CommentUpdated,
                crate::FeedKind::CommentDeleted => MessageKind::CommentDeleted,
                crate::FeedKind::PostReactionsUpdated => MessageKind::PostReactionsUpdated,
            }),
            InboundBody::Error(_) => Some(MessageKind::Error),
            InboundBody::Pong => Some(MessageKind::Pong),
            InboundBody::Unknown { .. } => None,
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(
    kind: MessageKind,
    data: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(data)
        .map_err(|e| ProtocolError::InvalidPayload { kind: kind.as_tag(), reason: e.to_string() })
}
