//! Presence and conversation state.
//!
//! The reconciled, in-memory view the UI renders from. Two paths feed it:
//! REST snapshots (bulk, applied on load and after every reconnect) and
//! WebSocket deltas (incremental). A snapshot wins at the moment it is
//! applied; deltas win afterwards.
//!
//! # Invariants
//!
//! - The active conversation has no unread messages while the UI is visible
//! - Every history is ordered by `created_at` and free of duplicate ids
//! - `Conversation::is_online` agrees with the presence set
//!
//! Methods return [`SessionAction`]s (renders and REST requests) instead of
//! calling anything.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use parlor_core::Moment;
use parlor_proto::{ChatMessage, ConversationSummary, PresenceStatus, UserId, UserSummary};

use crate::{
    conversation::Conversation,
    event::{RenderTarget, SessionAction, SyncRequest},
};

/// How long a typing hint stays visible without a refresh.
pub const DEFAULT_TYPING_WINDOW: Duration = Duration::from_secs(3);

/// Messages requested per history page.
pub const DEFAULT_HISTORY_PAGE: usize = 50;

/// State configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateConfig {
    /// Typing indicator lifetime.
    pub typing_window: Duration,
    /// History page size.
    pub history_page: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { typing_window: DEFAULT_TYPING_WINDOW, history_page: DEFAULT_HISTORY_PAGE }
    }
}

/// Conversations, presence, active conversation and typing hints.
#[derive(Debug, Clone)]
pub struct ChatState<I> {
    config: StateConfig,
    self_id: Option<UserId>,
    conversations: HashMap<UserId, Conversation>,
    online: HashSet<UserId>,
    active: Option<UserId>,
    visible: bool,
    /// Peer → when their typing hint expires.
    typing: HashMap<UserId, I>,
}

impl<I: Moment> ChatState<I> {
    /// Empty state. The UI starts visible.
    pub fn new(config: StateConfig) -> Self {
        Self {
            config,
            self_id: None,
            conversations: HashMap::new(),
            online: HashSet::new(),
            active: None,
            visible: true,
            typing: HashMap::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Local user, once credentials were seen.
    pub fn self_id(&self) -> Option<UserId> {
        self.self_id
    }

    /// Set the local user. Own messages are recognised by this id.
    pub fn set_self_id(&mut self, id: UserId) {
        self.self_id = Some(id);
    }

    /// Conversation with `peer`, if referenced so far.
    pub fn conversation(&self, peer: UserId) -> Option<&Conversation> {
        self.conversations.get(&peer)
    }

    /// All conversations, unordered.
    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    /// Conversations in list order: most recent message first, then by name.
    pub fn sorted_conversations(&self) -> Vec<&Conversation> {
        let mut list: Vec<_> = self.conversations.values().collect();
        list.sort_by(|a, b| Conversation::list_order(a, b));
        list
    }

    /// Unread count for `peer`. Zero for unknown peers.
    pub fn unread(&self, peer: UserId) -> u32 {
        self.conversations.get(&peer).map_or(0, |c| c.unread_count)
    }

    /// Sum of unread counts over all conversations.
    pub fn total_unread(&self) -> u32 {
        self.conversations.values().map(|c| c.unread_count).sum()
    }

    /// Whether `user` is in the presence set.
    pub fn is_online(&self, user: UserId) -> bool {
        self.online.contains(&user)
    }

    /// The presence set.
    pub fn online_users(&self) -> &HashSet<UserId> {
        &self.online
    }

    /// Active conversation.
    pub fn active(&self) -> Option<UserId> {
        self.active
    }

    /// Whether the UI is visible.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether `peer`'s typing hint is shown.
    pub fn is_typing(&self, peer: UserId) -> bool {
        self.typing.contains_key(&peer)
    }

    /// Open the conversation with `peer`.
    ///
    /// Resets its unread count and asks the server to do the same. Requests
    /// the first history page unless already loaded.
    pub fn select_conversation(&mut self, peer: UserId) -> Vec<SessionAction<I>> {
        self.active = Some(peer);
        let history_page = self.config.history_page;
        let conv = self.conversation_mut(peer);

        let mut actions = vec![SessionAction::Render(RenderTarget::Messages { peer })];
        if !conv.history_loaded() {
            actions.push(SessionAction::Sync(SyncRequest::History { peer, limit: history_page, offset: 0 }));
        }

        conv.unread_count = 0;
        actions.push(SessionAction::Sync(SyncRequest::MarkRead { peer }));
        actions.push(SessionAction::Render(RenderTarget::ConversationList));
        actions
    }

    /// Clear the active conversation.
    pub fn close_conversation(&mut self) -> Vec<SessionAction<I>> {
        match self.active.take() {
            Some(_) => vec![SessionAction::Render(RenderTarget::ConversationList)],
            None => vec![],
        }
    }

    /// Explicit mark-read: local reset plus server request.
    pub fn mark_read(&mut self, peer: UserId) -> Vec<SessionAction<I>> {
        self.conversation_mut(peer).unread_count = 0;
        vec![
            SessionAction::Sync(SyncRequest::MarkRead { peer }),
            SessionAction::Render(RenderTarget::ConversationList),
        ]
    }

    /// Note an outgoing message to `peer`.
    ///
    /// Nothing is appended: the server echoes the message back with its real
    /// id and that echo goes through [`ChatState::record_incoming`]. Only the
    /// conversation is created so it shows in the list.
    pub fn record_outgoing(&mut self, peer: UserId) -> Vec<SessionAction<I>> {
        if self.conversations.contains_key(&peer) {
            return vec![];
        }
        self.conversation_mut(peer);
        vec![SessionAction::Render(RenderTarget::ConversationList)]
    }

    /// Apply a `private_message` push.
    ///
    /// Messages from others count as unread unless their conversation is
    /// active and visible, in which case a server mark-read is requested
    /// instead. Our own echoed messages never touch unread counts.
    pub fn record_incoming(&mut self, message: ChatMessage) -> Vec<SessionAction<I>> {
        let me = self.self_id;
        let peer = message.peer_of(me);
        let own = message.is_from(me);
        let seen = self.visible && self.active == Some(peer);
        let sender_name = message.sender_name.clone();

        let conv = self.conversation_mut(peer);
        if !conv.insert_message(message.clone()) {
            tracing::debug!(id = message.id, peer, "duplicate message ignored");
            return vec![];
        }
        conv.offer_last_message(&message);
        if !own && conv.display_name.is_none() {
            conv.display_name = sender_name;
        }

        let mut actions = Vec::new();
        if !own {
            if seen {
                actions.push(SessionAction::Sync(SyncRequest::MarkRead { peer }));
            } else {
                conv.unread_count += 1;
            }
            if self.typing.remove(&peer).is_some() {
                actions.push(SessionAction::Render(RenderTarget::Typing { peer, active: false }));
            }
        }

        if self.active == Some(peer) {
            actions.push(SessionAction::Render(RenderTarget::Messages { peer }));
        }
        actions.push(SessionAction::Render(RenderTarget::ConversationList));
        actions
    }

    /// Merge a REST conversation snapshot, field by field.
    ///
    /// - display name: taken when present
    /// - last message: taken when at least as fresh as ours
    /// - unread count: taken only when the snapshot's last message is at
    ///   least as fresh as ours
    /// - presence: taken, and mirrored into the presence set
    pub fn merge_conversation_snapshot(&mut self, rows: Vec<ConversationSummary>) -> Vec<SessionAction<I>> {
        let mut actions = Vec::new();

        for row in rows {
            let peer = row.user_id;
            if Some(peer) == self.self_id {
                continue;
            }

            if let Some(online) = row.is_online {
                self.set_presence(peer, online);
            }

            let seen = self.visible && self.active == Some(peer);
            let conv = self.conversation_mut(peer);
            if let Some(name) = row.username {
                conv.display_name = Some(name);
            }

            let snapshot_fresh = match (&row.last_message, &conv.last_message) {
                (Some(theirs), Some(ours)) => theirs.created_at >= ours.created_at,
                (Some(_) | None, None) => true,
                (None, Some(_)) => false,
            };
            if let Some(last) = &row.last_message {
                conv.offer_last_message(last);
            }

            if let Some(unread) = row.unread_count
                && snapshot_fresh
            {
                if seen && unread > 0 {
                    conv.unread_count = 0;
                    actions.push(SessionAction::Sync(SyncRequest::MarkRead { peer }));
                } else if !seen {
                    conv.unread_count = unread;
                }
            }
        }

        actions.push(SessionAction::Render(RenderTarget::ConversationList));
        actions
    }

    /// Merge a REST history page for `peer`.
    pub fn apply_history(&mut self, peer: UserId, messages: Vec<ChatMessage>) -> Vec<SessionAction<I>> {
        let conv = self.conversation_mut(peer);
        let newest = messages.iter().max_by_key(|m| (m.created_at, m.id)).cloned();
        let added = conv.merge_history(messages);
        let list_changed = newest.is_some_and(|m| conv.offer_last_message(&m));

        tracing::debug!(peer, added, "history page merged");

        let mut actions = Vec::new();
        if self.active == Some(peer) {
            actions.push(SessionAction::Render(RenderTarget::Messages { peer }));
        }
        if list_changed {
            actions.push(SessionAction::Render(RenderTarget::ConversationList));
        }
        actions
    }

    /// Apply the REST user list: names and presence.
    pub fn apply_users(&mut self, users: Vec<UserSummary>) -> Vec<SessionAction<I>> {
        for user in users {
            if Some(user.id) == self.self_id {
                continue;
            }
            if let Some(online) = user.is_online {
                self.set_presence(user.id, online);
            }
            self.conversation_mut(user.id).display_name = Some(user.username);
        }
        vec![SessionAction::Render(RenderTarget::ConversationList)]
    }

    /// Replace the presence set wholesale (`online_users`).
    pub fn apply_presence_snapshot(&mut self, user_ids: Vec<UserId>) -> Vec<SessionAction<I>> {
        self.online = user_ids.into_iter().collect();
        for conv in self.conversations.values_mut() {
            conv.is_online = self.online.contains(&conv.peer_id);
        }
        vec![SessionAction::Render(RenderTarget::ConversationList)]
    }

    /// Apply a single presence change (`user_status`).
    pub fn apply_status(&mut self, user: UserId, status: PresenceStatus) -> Vec<SessionAction<I>> {
        let changed = self.set_presence(user, status.is_online());
        if changed && self.conversations.contains_key(&user) {
            vec![SessionAction::Render(RenderTarget::ConversationList)]
        } else {
            vec![]
        }
    }

    /// Forget all presence. The server no longer vouches for it once the
    /// socket is gone.
    pub fn clear_presence(&mut self) -> Vec<SessionAction<I>> {
        if self.online.is_empty() {
            return vec![];
        }
        self.online.clear();
        for conv in self.conversations.values_mut() {
            conv.is_online = false;
        }
        vec![SessionAction::Render(RenderTarget::ConversationList)]
    }

    /// Apply a `typing` push.
    pub fn note_typing(&mut self, peer: UserId, is_typing: bool, now: I) -> Vec<SessionAction<I>> {
        if Some(peer) == self.self_id {
            return vec![];
        }

        if is_typing {
            let fresh = self.typing.insert(peer, now + self.config.typing_window).is_none();
            if fresh {
                return vec![SessionAction::Render(RenderTarget::Typing { peer, active: true })];
            }
            vec![]
        } else if self.typing.remove(&peer).is_some() {
            vec![SessionAction::Render(RenderTarget::Typing { peer, active: false })]
        } else {
            vec![]
        }
    }

    /// Drop typing hints whose window has passed.
    pub fn expire_typing(&mut self, now: I) -> Vec<SessionAction<I>> {
        let mut expired: Vec<UserId> =
            self.typing.iter().filter(|(_, until)| now >= **until).map(|(peer, _)| *peer).collect();
        expired.sort_unstable();

        expired
            .into_iter()
            .map(|peer| {
                self.typing.remove(&peer);
                SessionAction::Render(RenderTarget::Typing { peer, active: false })
            })
            .collect()
    }

    /// Record UI visibility.
    ///
    /// Becoming visible with unread messages in the active conversation
    /// marks them read.
    pub fn set_visible(&mut self, visible: bool) -> Vec<SessionAction<I>> {
        let was_visible = std::mem::replace(&mut self.visible, visible);
        if !visible || was_visible {
            return vec![];
        }

        match self.active {
            Some(peer) if self.unread(peer) > 0 => self.mark_read(peer),
            _ => vec![],
        }
    }

    /// Returns `true` if membership changed.
    fn set_presence(&mut self, user: UserId, online: bool) -> bool {
        let changed = if online { self.online.insert(user) } else { self.online.remove(&user) };
        if let Some(conv) = self.conversations.get_mut(&user) {
            conv.is_online = online;
        }
        changed
    }

    fn conversation_mut(&mut self, peer: UserId) -> &mut Conversation {
        let online = self.online.contains(&peer);
        self.conversations.entry(peer).or_insert_with(|| {
            let mut conv = Conversation::new(peer);
            conv.is_online = online;
            conv
        })
    }
}
