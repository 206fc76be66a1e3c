//! Property-based tests for the connection state machine and outbound queue.

use std::time::Duration;

use parlor_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, OutboundFrame, OutboundQueue,
    QueueConfig, backoff_delay,
};
use parlor_proto::OutboundKind;
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Op {
    Connect,
    Opened,
    Closed(Option<u16>),
    Disconnect,
    Advance(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Connect),
        Just(Op::Opened),
        prop_oneof![Just(None), Just(Some(1000u16)), Just(Some(1006)), Just(Some(4000))].prop_map(Op::Closed),
        Just(Op::Disconnect),
        (0u64..90_000).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn prop_backoff_is_monotonic_and_capped(
        base_ms in 1u64..5_000,
        max_ms in 1u64..120_000,
        attempt in 0u32..64,
    ) {
        let base = Duration::from_millis(base_ms);
        let max = Duration::from_millis(max_ms);

        let delay = backoff_delay(attempt, base, max);
        let next = backoff_delay(attempt + 1, base, max);

        prop_assert!(delay <= max);
        prop_assert!(next >= delay);
    }

    #[test]
    fn prop_timers_never_overlap(ops in prop::collection::vec(op(), 1..64)) {
        let mut conn: Connection<Duration> = Connection::new(ConnectionConfig::default());
        let mut now = Duration::ZERO;

        for op in ops {
            let actions = match op {
                Op::Connect => conn.connect(now),
                Op::Opened => conn.handle_opened(now).unwrap_or_default(),
                Op::Closed(code) => conn.handle_closed(code, "prop", now),
                Op::Disconnect => conn.disconnect(now),
                Op::Advance(ms) => {
                    now += Duration::from_millis(ms);
                    conn.tick(now)
                },
            };

            prop_assert!(!(conn.heartbeat_armed() && conn.backoff_armed()));
            if conn.heartbeat_armed() {
                prop_assert_eq!(conn.state(), ConnectionState::Open);
            }
            if conn.backoff_armed() {
                prop_assert_eq!(conn.state(), ConnectionState::Closed);
            }
            if actions.contains(&ConnectionAction::OpenSocket) {
                prop_assert_eq!(conn.state(), ConnectionState::Connecting);
            }
            prop_assert!(conn.attempt() <= conn.config().max_reconnect_attempts);
        }
    }

    #[test]
    fn prop_flush_delivers_in_enqueue_order(
        contents in prop::collection::vec("[a-z]{1,8}", 0..32),
        fail_at in prop::option::of(0usize..32),
    ) {
        let mut queue = OutboundQueue::new(QueueConfig::default());
        for content in &contents {
            queue.enqueue(OutboundFrame::new(
                OutboundKind::PrivateMessage,
                json!({"receiver_id": 2, "content": content}),
                Duration::ZERO,
            ));
        }

        let mut sent = Vec::new();
        let mut calls = 0;
        let _ = queue.flush(Duration::ZERO, |frame| {
            if Some(calls) == fail_at {
                return Err(());
            }
            calls += 1;
            sent.push(frame.payload["content"].as_str().unwrap_or_default().to_string());
            Ok(())
        });

        let remaining: Vec<String> = queue
            .iter()
            .map(|frame| frame.payload["content"].as_str().unwrap_or_default().to_string())
            .collect();
        let mut all = sent.clone();
        all.extend(remaining);
        prop_assert_eq!(all, contents);
    }
}
