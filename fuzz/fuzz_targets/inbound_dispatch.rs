//! Fuzz target for routing server pushes into chat state
//!
//! # Strategy
//!
//! - Pushes: every known tag with small peer ids so conversations collide
//! - Garbage: arbitrary text between well-formed frames
//! - User actions: select, close, visibility, clock jumps
//!
//! # Invariants
//!
//! - Dispatch never panics
//! - The visible active conversation has nothing unread
//! - Histories stay sorted by creation time with unique ids
//! - Conversation presence flags mirror the presence set

#![no_main]

use std::{collections::HashSet, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parlor_client::{ChatState, Router, StateConfig};
use serde_json::json;

const ME: u64 = 1;

#[derive(Debug, Arbitrary)]
enum Op {
    Message { id: u8, from: u8, to: u8, minute: u8 },
    Status { user: u8, online: bool },
    Presence(Vec<u8>),
    Typing { user: u8, is_typing: bool },
    Feed { kind: u8, post: u16 },
    Error(String),
    Garbage(String),
    Select(u8),
    Close,
    Visible(bool),
    Advance(u16),
}

fn user(n: u8) -> u64 {
    u64::from(n % 6) + 1
}

fn frame(op: &Op) -> Option<String> {
    let value = match op {
        Op::Message { id, from, to, minute } => json!({
            "type": "private_message",
            "data": {
                "id": id,
                "sender_id": user(*from),
                "receiver_id": user(*to),
                "content": "x",
                "created_at": format!("2026-03-01T10:{:02}:00Z", minute % 60),
            },
        }),
        Op::Status { user: u, online } => json!({
            "type": "user_status",
            "data": {"user_id": user(*u), "status": if *online { "online" } else { "offline" }},
        }),
        Op::Presence(users) => json!({
            "type": "online_users",
            "data": users.iter().map(|u| user(*u)).collect::<Vec<_>>(),
        }),
        Op::Typing { user: u, is_typing } => json!({
            "type": "typing",
            "data": {"user_id": user(*u), "is_typing": is_typing},
        }),
        Op::Feed { kind, post } => {
            let tags = ["post_created", "comment_added", "comment_updated", "comment_deleted", "post_reactions_updated"];
            json!({"type": tags[usize::from(*kind) % tags.len()], "data": {"post_id": post}})
        },
        Op::Error(message) => json!({"type": "error", "data": {"message": message}}),
        Op::Garbage(text) => return Some(text.clone()),
        Op::Select(_) | Op::Close | Op::Visible(_) | Op::Advance(_) => return None,
    };
    Some(value.to_string())
}

fuzz_target!(|ops: Vec<Op>| {
    let router = Router::standard();
    let mut state: ChatState<Duration> = ChatState::new(StateConfig::default());
    state.set_self_id(ME);
    let mut now = Duration::ZERO;

    for op in &ops {
        match op {
            Op::Select(u) => {
                state.select_conversation(user(*u));
            },
            Op::Close => {
                state.close_conversation();
            },
            Op::Visible(visible) => {
                state.set_visible(*visible);
            },
            Op::Advance(ms) => {
                now += Duration::from_millis(u64::from(*ms));
                state.expire_typing(now);
            },
            _ => {
                if let Some(text) = frame(op) {
                    router.dispatch(&mut state, &text, now);
                }
            },
        }

        if state.is_visible()
            && let Some(active) = state.active()
        {
            assert_eq!(state.unread(active), 0, "visible active conversation {active} has unread");
        }

        for conversation in state.conversations() {
            assert_eq!(conversation.is_online, state.is_online(conversation.peer_id));

            let history = conversation.history();
            assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
            let ids: HashSet<_> = history.iter().map(|m| m.id).collect();
            assert_eq!(ids.len(), history.len());
        }
    }
});
