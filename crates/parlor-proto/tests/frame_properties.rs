//! Property-based tests for frame decoding.
//!
//! Inbound frames come from the network; decoding must never panic and must
//! classify every input as either an error or a message.

use parlor_proto::{InboundBody, InboundMessage, MessageKind, ProtocolError};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn prop_decode_never_panics(text in ".{0,256}") {
        let _ = InboundMessage::decode(&text);
    }

    #[test]
    fn prop_unknown_tags_decode_to_unknown(tag in "[a-z_]{1,24}", data in any::<i64>()) {
        prop_assume!(MessageKind::from_tag(&tag).is_none());

        let text = json!({"type": tag, "data": data}).to_string();
        let msg = InboundMessage::decode(&text).unwrap();
        prop_assert_eq!(msg.body, InboundBody::Unknown { tag });
    }

    #[test]
    fn prop_presence_snapshot_keeps_ids(ids in prop::collection::vec(any::<u64>(), 0..32)) {
        let text = json!({"type": "online_users", "data": {"user_ids": ids}}).to_string();
        let msg = InboundMessage::decode(&text).unwrap();
        match msg.body {
            InboundBody::OnlineUsers(online) => prop_assert_eq!(online.user_ids, ids),
            other => prop_assert!(false, "unexpected body {:?}", other),
        }
    }
}

#[test]
fn every_known_kind_with_null_data_is_classified() {
    for kind in MessageKind::ALL {
        let text = json!({"type": kind.as_tag(), "data": null}).to_string();
        match InboundMessage::decode(&text) {
            Ok(msg) => assert_eq!(msg.kind(), Some(kind)),
            Err(ProtocolError::InvalidPayload { kind: tag, .. }) => assert_eq!(tag, kind.as_tag()),
            Err(other) => panic!("unexpected error for {kind}: {other}"),
        }
    }
}
