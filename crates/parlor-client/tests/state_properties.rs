//! Property-based tests for conversation state reconciliation.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use parlor_client::{ChatState, StateConfig};
use parlor_proto::{ChatMessage, PresenceStatus};
use proptest::prelude::*;

const ME: u64 = 1;

fn message(id: u64, from: u64, to: u64, secs: i64) -> ChatMessage {
    ChatMessage {
        id,
        sender_id: from,
        receiver_id: to,
        content: format!("m{id}"),
        created_at: DateTime::<Utc>::from_timestamp(1_772_000_000 + secs, 0).unwrap_or_default(),
        sender_name: None,
    }
}

fn state() -> ChatState<Duration> {
    let mut state = ChatState::new(StateConfig::default());
    state.set_self_id(ME);
    state
}

proptest! {
    #[test]
    fn prop_unread_counts_every_unseen_message_once(
        senders in prop::collection::vec(2u64..6, 0..40),
        active in prop::option::of(2u64..6),
    ) {
        let mut state = state();
        if let Some(peer) = active {
            state.select_conversation(peer);
        }

        let mut expected: HashMap<u64, u32> = HashMap::new();
        for (i, from) in senders.iter().enumerate() {
            let id = i as u64 + 1;
            state.record_incoming(message(id, *from, ME, i as i64));
            // Redelivery of the same id must not count twice.
            state.record_incoming(message(id, *from, ME, i as i64));
            if Some(*from) != active {
                *expected.entry(*from).or_default() += 1;
            }
        }

        for peer in 2u64..6 {
            prop_assert_eq!(state.unread(peer), expected.get(&peer).copied().unwrap_or(0));
        }
    }

    #[test]
    fn prop_history_sorted_whatever_the_arrival_order(
        times in prop::collection::vec(0i64..10_000, 1..40),
    ) {
        let mut state = state();
        let (pushed, page) = times.split_at(times.len() / 2);

        for (i, secs) in pushed.iter().enumerate() {
            state.record_incoming(message(i as u64, 2, ME, *secs));
        }
        let offset = pushed.len() as u64;
        let page = page.iter().enumerate().map(|(i, secs)| message(offset + i as u64, 2, ME, *secs)).collect();
        state.apply_history(2, page);

        let history = state.conversation(2).map(|c| c.history().to_vec()).unwrap_or_default();
        prop_assert_eq!(history.len(), times.len());
        prop_assert!(history.windows(2).all(|w| (w[0].created_at, w[0].id) <= (w[1].created_at, w[1].id)));
    }

    #[test]
    fn prop_presence_flags_follow_the_set(
        snapshot in prop::collection::vec(2u64..8, 0..6),
        deltas in prop::collection::vec((2u64..8, any::<bool>()), 0..20),
    ) {
        let mut state = state();
        for peer in 2u64..8 {
            state.record_outgoing(peer);
        }

        state.apply_presence_snapshot(snapshot);
        for (user, online) in deltas {
            let status = if online { PresenceStatus::Online } else { PresenceStatus::Offline };
            state.apply_status(user, status);
        }

        for conversation in state.conversations() {
            prop_assert_eq!(conversation.is_online, state.is_online(conversation.peer_id));
        }
    }

    #[test]
    fn prop_list_puts_recent_conversations_first(
        last in prop::collection::vec(prop::option::of(0i64..1_000), 1..10),
    ) {
        let mut state = state();
        for (i, secs) in last.iter().enumerate() {
            let peer = i as u64 + 2;
            match secs {
                Some(secs) => {
                    state.record_incoming(message(i as u64, peer, ME, *secs));
                },
                None => {
                    state.record_outgoing(peer);
                },
            }
        }

        let list = state.sorted_conversations();
        prop_assert_eq!(list.len(), last.len());

        let with_message = list.iter().take_while(|c| c.last_message.is_some()).count();
        prop_assert!(list[with_message..].iter().all(|c| c.last_message.is_none()));

        let times: Vec<_> = list[..with_message]
            .iter()
            .filter_map(|c| c.last_message.as_ref().map(|m| m.created_at))
            .collect();
        prop_assert!(times.windows(2).all(|w| w[0] >= w[1]));
    }
}
