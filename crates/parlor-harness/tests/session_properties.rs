//! Property tests over random session histories.
//!
//! proptest generates a sequence of user actions, server pushes, socket
//! failures and clock jumps. After every step the standard invariants must
//! hold; at the end every composed message must have reached the socket
//! exactly once, in the order it was composed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parlor_client::{SessionEvent, SyncResponse};
use parlor_core::ConnectionState;
use parlor_harness::Simulation;
use parlor_proto::ChatMessage;
use proptest::prelude::*;
use serde_json::json;

const ME: u64 = 1;

#[derive(Debug, Clone)]
enum Op {
    Connect,
    Open,
    Drop(Option<u16>),
    Disconnect,
    Advance(u64),
    Send(u64),
    Typing(u64),
    Incoming { from: u64 },
    Echo { to: u64 },
    Presence(Vec<u64>),
    Status { user: u64, online: bool },
    PeerTyping(u64),
    Select(u64),
    CloseConversation,
    Visible(bool),
    History { peer: u64, count: u64 },
    RefuseSends(bool),
    RefuseOpens(bool),
}

fn peer() -> impl Strategy<Value = u64> {
    2u64..6
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Connect),
        3 => Just(Op::Open),
        2 => prop_oneof![Just(None), Just(Some(1000u16)), Just(Some(1006)), Just(Some(1011))].prop_map(Op::Drop),
        1 => Just(Op::Disconnect),
        3 => (0u64..45).prop_map(Op::Advance),
        4 => peer().prop_map(Op::Send),
        1 => peer().prop_map(Op::Typing),
        4 => peer().prop_map(|from| Op::Incoming { from }),
        1 => peer().prop_map(|to| Op::Echo { to }),
        1 => prop::collection::vec(peer(), 0..4).prop_map(Op::Presence),
        2 => (peer(), any::<bool>()).prop_map(|(user, online)| Op::Status { user, online }),
        1 => peer().prop_map(Op::PeerTyping),
        2 => peer().prop_map(Op::Select),
        1 => Just(Op::CloseConversation),
        2 => any::<bool>().prop_map(Op::Visible),
        1 => (peer(), 0u64..4).prop_map(|(peer, count)| Op::History { peer, count }),
        1 => any::<bool>().prop_map(Op::RefuseSends),
        1 => any::<bool>().prop_map(Op::RefuseOpens),
    ]
}

/// Creation times out of id order, so merges must sort.
fn scrambled_time(id: u64) -> DateTime<Utc> {
    let offset = i64::try_from((id * 7919) % 1000).unwrap_or(0);
    DateTime::<Utc>::from_timestamp(1_772_000_000 + offset, 0).unwrap_or_default()
}

struct Script {
    sim: Simulation,
    composed: Vec<String>,
    next_id: u64,
}

impl Script {
    fn new() -> Self {
        Self { sim: Simulation::new(ME).unwrap(), composed: Vec::new(), next_id: 1 }
    }

    fn message(&mut self, from: u64, to: u64) -> ChatMessage {
        let id = self.next_id;
        self.next_id += 1;
        ChatMessage {
            id,
            sender_id: from,
            receiver_id: to,
            content: format!("push {id}"),
            created_at: scrambled_time(id),
            sender_name: None,
        }
    }

    fn apply(&mut self, op: &Op) {
        let sim = &mut self.sim;
        match op {
            Op::Connect => sim.connect(),
            Op::Open => sim.open(),
            Op::Drop(code) => sim.drop_socket(*code, "dropped"),
            Op::Disconnect => sim.step(SessionEvent::Disconnect),
            Op::Advance(secs) => sim.advance(Duration::from_secs(*secs)),
            Op::Send(to) => {
                let content = format!("msg {}", self.composed.len());
                self.composed.push(content.clone());
                sim.step(SessionEvent::SendMessage { to: *to, content });
            },
            Op::Typing(to) => sim.step(SessionEvent::SendTyping { to: *to }),
            Op::Incoming { from } => {
                let message = self.message(*from, ME);
                self.sim.push(&json!({"type": "private_message", "data": message}));
            },
            Op::Echo { to } => {
                let message = self.message(ME, *to);
                self.sim.push(&json!({"type": "private_message", "data": message}));
            },
            Op::Presence(users) => sim.push(&json!({"type": "online_users", "data": users})),
            Op::Status { user, online } => {
                let status = if *online { "online" } else { "offline" };
                sim.push(&json!({"type": "user_status", "data": {"user_id": user, "status": status}}));
            },
            Op::PeerTyping(user) => sim.push(&json!({"type": "typing", "data": {"user_id": user}})),
            Op::Select(peer) => sim.step(SessionEvent::SelectConversation { peer: *peer }),
            Op::CloseConversation => sim.step(SessionEvent::CloseConversation),
            Op::Visible(visible) => sim.step(SessionEvent::SetVisible(*visible)),
            Op::History { peer, count } => {
                let messages = (0..*count).map(|_| self.message(*peer, ME)).collect();
                self.sim.respond(SyncResponse::History { peer: *peer, messages });
            },
            Op::RefuseSends(refuse) => sim.driver().refuse_sends(*refuse),
            Op::RefuseOpens(refuse) => sim.driver().refuse_opens(*refuse),
        }
    }

    /// Heal the network and bring up a fresh connection.
    fn settle(&mut self) {
        let sim = &mut self.sim;
        sim.driver().refuse_sends(false);
        sim.driver().refuse_opens(false);

        sim.step(SessionEvent::Disconnect);
        if sim.session().connection().state() == ConnectionState::Closing {
            sim.drop_socket(Some(1000), "bye");
        }
        sim.connect_and_open();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_after_every_step(ops in prop::collection::vec(op(), 1..80)) {
        let mut script = Script::new();

        for (i, op) in ops.iter().enumerate() {
            script.apply(op);
            let result = script.sim.check();
            prop_assert!(result.is_ok(), "after op {i} ({op:?}): {result:?}");
        }
    }

    #[test]
    fn composed_messages_arrive_once_in_order(ops in prop::collection::vec(op(), 1..80)) {
        let mut script = Script::new();
        for op in &ops {
            script.apply(op);
        }
        script.settle();

        prop_assert!(script.sim.session().connection().is_open());
        prop_assert!(script.sim.session().queue().is_empty());

        let delivered: Vec<String> = script
            .sim
            .driver()
            .take_sent_json()
            .into_iter()
            .filter(|frame| frame["type"] == "private_message")
            .filter_map(|frame| frame["data"]["content"].as_str().map(str::to_string))
            .collect();
        prop_assert_eq!(delivered, script.composed);
    }

    #[test]
    fn reconnect_delay_never_exceeds_cap(failures in 1usize..20) {
        let mut sim = Simulation::new(ME).unwrap();
        sim.connect();

        for _ in 0..failures {
            sim.drop_socket(None, "refused");
            let delay = sim.session().connection().backoff();
            prop_assert!(delay <= Duration::from_secs(30));
            if sim.session().connection().is_exhausted() {
                sim.connect();
            } else {
                sim.advance(delay);
            }
        }
        prop_assert!(sim.check().is_ok());
    }
}
