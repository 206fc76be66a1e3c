//! UI adapter seam.
//!
//! Rendering (HTML, terminal, anything else) is not part of the session. The
//! runtime calls an [`UiAdapter`] with a read-only view of the state after
//! every mutation that needs a redraw.

use parlor_client::Conversation;
use parlor_core::ConnectionStatus;
use parlor_proto::{FeedEvent, UserId};

/// Render callbacks.
///
/// Implementations must not block: they run inside the event loop.
pub trait UiAdapter {
    /// Redraw the conversation list, already in display order.
    fn render_conversation_list(&mut self, conversations: &[&Conversation], active: Option<UserId>);

    /// Redraw the message list of one conversation.
    fn render_messages(&mut self, conversation: &Conversation);

    /// Show or hide the typing indicator of `peer`.
    fn render_typing(&mut self, peer: UserId, active: bool);

    /// Connection status changed.
    fn render_status(&mut self, status: &ConnectionStatus);

    /// A post/comment feed update arrived.
    fn feed_update(&mut self, event: &FeedEvent);

    /// Non-fatal notification (server error frame, failed refresh).
    fn notify(&mut self, message: &str, code: Option<&str>);

    /// Reconnect attempts are exhausted; offer a manual retry.
    fn reconnection_failed(&mut self, attempts: u32);

    /// Credentials were rejected; the user has to log in again.
    fn session_expired(&mut self);
}
