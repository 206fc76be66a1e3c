//! Credentials and the endpoint they unlock.

use parlor_proto::UserId;
use url::Url;

use crate::error::SessionError;

/// Who we are and the bearer token proving it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Local user.
    pub user_id: UserId,
    /// Bearer token, sent as the `token` query parameter of the socket URL
    /// and as the `Authorization` header of REST calls.
    pub token: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(user_id: UserId, token: impl Into<String>) -> Self {
        Self { user_id, token: token.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("user_id", &self.user_id).field("token", &"<redacted>").finish()
    }
}

/// Source of credentials, consulted before every connect attempt.
///
/// Token storage lives behind this trait; the session never keeps a token
/// beyond the attempt it was read for.
pub trait AuthProvider: Send + Sync {
    /// Current credentials. `None` means logged out: no socket is opened.
    fn credentials(&self) -> Option<Credentials>;
}

impl AuthProvider for Credentials {
    fn credentials(&self) -> Option<Credentials> {
        Some(self.clone())
    }
}

impl AuthProvider for Option<Credentials> {
    fn credentials(&self) -> Option<Credentials> {
        self.clone()
    }
}

/// Normalise a configured endpoint to the socket URL without token.
///
/// `http(s)` is mapped to `ws(s)`, and an empty path becomes `/ws`.
///
/// # Errors
///
/// - `SessionError::InvalidEndpoint` if `raw` is not a URL or uses another
///   scheme
pub fn socket_endpoint(raw: &str) -> Result<Url, SessionError> {
    let mut url = Url::parse(raw).map_err(|e| SessionError::InvalidEndpoint(format!("{raw}: {e}")))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(SessionError::InvalidEndpoint(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme).map_err(|()| SessionError::InvalidEndpoint(format!("cannot use scheme {scheme}")))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/ws");
    }
    url.set_query(None);
    Ok(url)
}

/// Socket URL for one connect attempt: `endpoint?token=<token>`.
pub fn socket_url(endpoint: &Url, token: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut().clear().append_pair("token", token);
    url
}
