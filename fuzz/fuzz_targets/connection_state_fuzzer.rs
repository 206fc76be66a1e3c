//! Fuzz target for the connection state machine
//!
//! # Strategy
//!
//! - Socket outcomes in any order, including stale and duplicate reports
//! - Close codes: normal, abnormal, and absent
//! - Clock jumps small enough to land between timers and large enough to
//!   skip several
//!
//! # Invariants
//!
//! - Heartbeat timer armed only while Open
//! - Backoff timer armed only while Closed
//! - Attempt counter never exceeds the configured maximum
//! - Backoff delay never exceeds the configured cap
//! - Every OpenSocket is preceded by a transition to Connecting

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parlor_core::{Connection, ConnectionAction, ConnectionConfig, ConnectionState, ConnectionStatus};

#[derive(Debug, Arbitrary)]
enum Op {
    Connect,
    Opened,
    Activity,
    Closed { code: Option<u16> },
    Error,
    Disconnect,
    Abandon,
    Advance { ms: u32 },
}

fuzz_target!(|ops: Vec<Op>| {
    let config = ConnectionConfig::default();
    let max_attempts = config.max_reconnect_attempts;
    let max_delay = config.max_delay;
    let mut conn: Connection<Duration> = Connection::new(config);
    let mut now = Duration::ZERO;

    for op in ops {
        let actions = match op {
            Op::Connect => conn.connect(now),
            Op::Opened => conn.handle_opened(now).unwrap_or_default(),
            Op::Activity => {
                conn.handle_activity(now);
                vec![]
            },
            Op::Closed { code } => conn.handle_closed(code, "fuzz", now),
            Op::Error => {
                conn.record_error("fuzz");
                vec![]
            },
            Op::Disconnect => conn.disconnect(now),
            Op::Abandon => conn.abandon(),
            Op::Advance { ms } => {
                now += Duration::from_millis(u64::from(ms % 120_000));
                conn.tick(now)
            },
        };

        for action in &actions {
            match action {
                ConnectionAction::OpenSocket => assert_eq!(conn.state(), ConnectionState::Connecting),
                ConnectionAction::SendPing => assert_eq!(conn.state(), ConnectionState::Open),
                ConnectionAction::CloseSocket { .. } => assert_eq!(conn.state(), ConnectionState::Closing),
                ConnectionAction::Status(ConnectionStatus::Reconnecting { attempt, delay }) => {
                    assert!((1..=max_attempts).contains(attempt));
                    assert!(*delay <= max_delay);
                },
                ConnectionAction::GaveUp { attempts } => assert_eq!(*attempts, max_attempts),
                ConnectionAction::Status(_) => {},
            }
        }

        if conn.heartbeat_armed() {
            assert_eq!(conn.state(), ConnectionState::Open);
        }
        if conn.backoff_armed() {
            assert_eq!(conn.state(), ConnectionState::Closed);
        }
        assert!(conn.attempt() <= max_attempts);
        assert!(conn.backoff() <= max_delay);
    }
});
