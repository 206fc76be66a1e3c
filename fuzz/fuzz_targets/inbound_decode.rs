//! Fuzz target for inbound frame decoding
//!
//! The server is untrusted: any text it sends must decode to a message or
//! an error, never a panic.
//!
//! # Strategy
//!
//! - Raw: arbitrary bytes, kept when valid UTF-8
//! - Shaped: a well-formed envelope around a known tag with arbitrary data
//!
//! # Invariants
//!
//! - Decoding never panics
//! - A decoded envelope survives encode/decode unchanged

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parlor_proto::{Envelope, InboundBody, InboundMessage, MessageKind};

const TAGS: &[&str] = &[
    "private_message",
    "user_status",
    "online_users",
    "typing",
    "post_created",
    "comment_added",
    "comment_updated",
    "comment_deleted",
    "post_reactions_updated",
    "error",
    "pong",
];

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    Shaped { tag: u8, data: String, timestamp: Option<String> },
}

fuzz_target!(|input: Input| {
    let text = match input {
        Input::Raw(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return,
        },
        Input::Shaped { tag, data, timestamp } => {
            let tag = TAGS[usize::from(tag) % TAGS.len()];
            let data = serde_json::from_str(&data).unwrap_or(serde_json::Value::String(data));
            let mut frame = serde_json::json!({ "type": tag, "data": data });
            if let Some(timestamp) = timestamp {
                frame["timestamp"] = serde_json::Value::String(timestamp);
            }
            frame.to_string()
        },
    };

    let Ok(envelope) = Envelope::decode(&text) else {
        assert!(InboundMessage::decode(&text).is_err(), "message decoded without an envelope");
        return;
    };

    let encoded = envelope.encode().expect("decoded envelope must encode");
    let again = Envelope::decode(&encoded).expect("encoded envelope must decode");
    assert_eq!(again, envelope);

    if let Ok(message) = InboundMessage::from_envelope(envelope.clone()) {
        match (&message.body, MessageKind::from_tag(&envelope.tag)) {
            (InboundBody::Unknown { tag }, None) => assert_eq!(tag, &envelope.tag),
            (InboundBody::Unknown { .. }, Some(kind)) => panic!("known tag {kind:?} decoded as unknown"),
            (_, None) => panic!("unknown tag {} decoded as known", envelope.tag),
            (_, Some(_)) => {},
        }
    }
});
