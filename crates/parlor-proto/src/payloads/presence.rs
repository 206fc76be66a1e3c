//! Presence payloads.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Online state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Connected to the server.
    Online,
    /// Not connected.
    Offline,
}

impl PresenceStatus {
    /// True for [`PresenceStatus::Online`].
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

/// `user_status` delta: one user changed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    /// User whose state changed.
    pub user_id: UserId,
    /// New state.
    pub status: PresenceStatus,
}

/// `online_users` snapshot.
///
/// Servers send either `{"user_ids": [..]}` or a bare array; both decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OnlineUsersRepr")]
pub struct OnlineUsers {
    /// Every user currently online.
    pub user_ids: Vec<UserId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OnlineUsersRepr {
    Wrapped { user_ids: Vec<UserId> },
    Bare(Vec<UserId>),
}

impl From<OnlineUsersRepr> for OnlineUsers {
    fn from(repr: OnlineUsersRepr) -> Self {
        match repr {
            OnlineUsersRepr::Wrapped { user_ids } | OnlineUsersRepr::Bare(user_ids) => {
                Self { user_ids }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_users_accepts_both_shapes() {
        let wrapped: OnlineUsers = serde_json::from_str(r#"{"user_ids": [1, 2]}"#).unwrap();
        let bare: OnlineUsers = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(bare.user_ids, vec![1, 2]);
    }

    #[test]
    fn status_is_lowercase_on_the_wire() {
        let status: UserStatus =
            serde_json::from_str(r#"{"user_id": 9, "status": "offline"}"#).unwrap();
        assert_eq!(status.status, PresenceStatus::Offline);
        assert!(!status.status.is_online());
        assert!(serde_json::from_str::<UserStatus>(r#"{"user_id": 9, "status": "away"}"#).is_err());
    }
}
