//! Line-oriented terminal rendering.
//!
//! Implements [`UiAdapter`] by writing plain lines to any [`Write`]. No
//! cursor control: every redraw appends, which keeps the output usable in a
//! pipe or a log.

use std::{
    fmt,
    io::{self, Write},
};

use parlor_app::UiAdapter;
use parlor_client::Conversation;
use parlor_core::ConnectionStatus;
use parlor_proto::{FeedEvent, UserId};

/// Messages shown when a conversation is redrawn.
pub const DEFAULT_HISTORY_TAIL: usize = 20;

/// Terminal UI adapter.
pub struct TerminalAdapter<W: Write = io::Stdout> {
    out: W,
    self_id: UserId,
    history_tail: usize,
}

impl TerminalAdapter<io::Stdout> {
    /// Adapter writing to standard output.
    pub fn stdout(self_id: UserId) -> Self {
        Self::new(io::stdout(), self_id)
    }
}

impl<W: Write> TerminalAdapter<W> {
    /// Adapter writing to `out` on behalf of `self_id`.
    pub fn new(out: W, self_id: UserId) -> Self {
        Self { out, self_id, history_tail: DEFAULT_HISTORY_TAIL }
    }

    /// Change how many messages a conversation redraw shows.
    #[must_use]
    pub fn with_history_tail(mut self, history_tail: usize) -> Self {
        self.history_tail = history_tail;
        self
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        let result = self.out.write_fmt(args).and_then(|()| self.out.write_all(b"\n"));
        if let Err(e) = result.and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "terminal write failed");
        }
    }
}

impl<W: Write> UiAdapter for TerminalAdapter<W> {
    fn render_conversation_list(&mut self, conversations: &[&Conversation], active: Option<UserId>) {
        if conversations.is_empty() {
            self.line(format_args!("-- no conversations --"));
            return;
        }

        self.line(format_args!("-- conversations --"));
        for conversation in conversations {
            let marker = if active == Some(conversation.peer_id) { '>' } else { ' ' };
            let online = if conversation.is_online { " *" } else { "" };
            let unread = match conversation.unread_count {
                0 => String::new(),
                n => format!(" [{n}]"),
            };
            let label = match &conversation.display_name {
                Some(name) => format!("{name} ({})", conversation.peer_id),
                None => conversation.peer_id.to_string(),
            };
            self.line(format_args!("{marker} {label}{online}{unread}"));
        }
    }

    fn render_messages(&mut self, conversation: &Conversation) {
        let name = conversation.name();
        self.line(format_args!("-- {name} --"));

        let history = conversation.history();
        let skip = history.len().saturating_sub(self.history_tail);
        for message in history.iter().skip(skip) {
            let sender = if message.sender_id == self.self_id { "me" } else { name.as_str() };
            self.line(format_args!("[{}] {sender}: {}", message.created_at.format("%H:%M"), message.content));
        }
    }

    fn render_typing(&mut self, peer: UserId, active: bool) {
        if active {
            self.line(format_args!("({peer} is typing...)"));
        }
    }

    fn render_status(&mut self, status: &ConnectionStatus) {
        match status {
            ConnectionStatus::Connecting => self.line(format_args!("connecting...")),
            ConnectionStatus::Connected => self.line(format_args!("connected")),
            ConnectionStatus::Disconnected => self.line(format_args!("disconnected")),
            ConnectionStatus::Reconnecting { attempt, delay } => self.line(format_args!(
                "connection lost, retrying in {}s (attempt {attempt})",
                delay.as_secs()
            )),
            ConnectionStatus::Failed { attempts } => {
                self.line(format_args!("connection failed after {attempts} attempts"));
            },
        }
    }

    fn feed_update(&mut self, event: &FeedEvent) {
        self.line(format_args!("feed: {:?} {}", event.kind, event.data));
    }

    fn notify(&mut self, message: &str, code: Option<&str>) {
        match code {
            Some(code) => self.line(format_args!("! {message} ({code})")),
            None => self.line(format_args!("! {message}")),
        }
    }

    fn reconnection_failed(&mut self, _attempts: u32) {
        self.line(format_args!("type /connect to try again"));
    }

    fn session_expired(&mut self) {
        self.line(format_args!("session expired: log in again and restart with a fresh token"));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use parlor_proto::ChatMessage;

    use super::*;

    fn output(adapter: TerminalAdapter<Vec<u8>>) -> String {
        String::from_utf8(adapter.into_inner()).unwrap()
    }

    fn message(id: u64, sender_id: UserId, minute: u32, content: &str) -> ChatMessage {
        ChatMessage {
            id,
            sender_id,
            receiver_id: if sender_id == 1 { 2 } else { 1 },
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).unwrap(),
            sender_name: None,
        }
    }

    #[test]
    fn list_marks_active_online_and_unread() {
        let mut alice = Conversation::new(2);
        alice.display_name = Some("alice".into());
        alice.is_online = true;
        let mut bob = Conversation::new(3);
        bob.unread_count = 4;

        let mut ui = TerminalAdapter::new(Vec::new(), 1);
        ui.render_conversation_list(&[&alice, &bob], Some(2));

        assert_eq!(output(ui), "-- conversations --\n> alice (2) *\n  3 [4]\n");
    }

    #[test]
    fn messages_show_the_tail_with_sender() {
        let mut conversation = Conversation::new(2);
        conversation.display_name = Some("alice".into());
        conversation.insert_message(message(1, 2, 0, "first"));
        conversation.insert_message(message(2, 1, 1, "second"));
        conversation.insert_message(message(3, 2, 2, "third"));

        let mut ui = TerminalAdapter::new(Vec::new(), 1).with_history_tail(2);
        ui.render_messages(&conversation);

        assert_eq!(output(ui), "-- alice --\n[10:01] me: second\n[10:02] alice: third\n");
    }

    #[test]
    fn status_lines() {
        let mut ui = TerminalAdapter::new(Vec::new(), 1);
        ui.render_status(&ConnectionStatus::Reconnecting { attempt: 2, delay: Duration::from_secs(4) });
        ui.notify("not allowed", Some("forbidden"));

        assert_eq!(output(ui), "connection lost, retrying in 4s (attempt 2)\n! not allowed (forbidden)\n");
    }

    #[test]
    fn typing_stop_is_silent() {
        let mut ui = TerminalAdapter::new(Vec::new(), 1);
        ui.render_typing(2, false);
        assert!(output(ui).is_empty());
    }
}
