//! Standard invariant checks.

use std::collections::HashSet;

use parlor_core::ConnectionState;

use super::{Invariant, InvariantResult, SessionSnapshot, Violation};

/// The conversation on screen has nothing unread.
///
/// While a conversation is active and the UI is visible, every incoming
/// message is read as it arrives.
pub struct ActiveConversationRead;

impl Invariant for ActiveConversationRead {
    fn name(&self) -> &'static str {
        "active_conversation_read"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let Some(active) = state.active else { return Ok(()) };
        if !state.visible {
            return Ok(());
        }

        match state.conversation(active) {
            Some(conversation) if conversation.unread > 0 => Err(Violation {
                invariant: self.name(),
                message: format!("active conversation {active} shows {} unread", conversation.unread),
            }),
            _ => Ok(()),
        }
    }
}

/// Histories are sorted by `created_at` and hold each message id once.
pub struct HistoryOrdered;

impl Invariant for HistoryOrdered {
    fn name(&self) -> &'static str {
        "history_ordered"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            if let Some(pair) = conversation.history.windows(2).find(|pair| pair[1].0 < pair[0].0) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "conversation {}: message {} at {} sorted after message {} at {}",
                        conversation.peer, pair[1].1, pair[1].0, pair[0].1, pair[0].0
                    ),
                });
            }

            let mut seen = HashSet::new();
            if let Some((_, id)) = conversation.history.iter().find(|(_, id)| !seen.insert(*id)) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("conversation {}: message {id} stored twice", conversation.peer),
                });
            }
        }
        Ok(())
    }
}

/// A conversation's presence flag mirrors the presence set.
pub struct PresenceMirrored;

impl Invariant for PresenceMirrored {
    fn name(&self) -> &'static str {
        "presence_mirrored"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            let in_set = state.online.contains(&conversation.peer);
            if conversation.is_online != in_set {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "conversation {}: is_online={} but presence set says {in_set}",
                        conversation.peer, conversation.is_online
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Heartbeat only runs while open, backoff only while closed.
pub struct TimersExclusive;

impl Invariant for TimersExclusive {
    fn name(&self) -> &'static str {
        "timers_exclusive"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let message = if state.heartbeat_armed && state.backoff_armed {
            "heartbeat and backoff armed together".to_string()
        } else if state.heartbeat_armed && state.connection != ConnectionState::Open {
            format!("heartbeat armed while {:?}", state.connection)
        } else if state.backoff_armed && state.connection != ConnectionState::Closed {
            format!("backoff armed while {:?}", state.connection)
        } else {
            return Ok(());
        };

        Err(Violation { invariant: self.name(), message })
    }
}
