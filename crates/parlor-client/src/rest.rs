//! REST sync client.
//!
//! The bulk path: conversation snapshots, history pages, user lists and
//! mark-read acknowledgements. Results are handed back to the session as
//! [`SyncResponse`]s.

use parlor_proto::{ChatMessage, ConversationSummary, MarkReadRequest, UserSummary};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::event::{SyncRequest, SyncResponse};

/// REST errors.
#[derive(Debug, Error)]
pub enum RestError {
    /// HTTP 401: the token is no longer valid.
    #[error("unauthorized")]
    Unauthorized,

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },

    /// Request could not be performed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL cannot be joined with an endpoint path.
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RestError {
    /// Whether this is a credentials problem.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// HTTP client for the chat REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    token: String,
}

impl HttpApi {
    /// Client for the API rooted at `base` (e.g. `https://forum.example/api/`).
    pub fn new(base: Url, token: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base, token: token.into() }
    }

    /// Perform `request`.
    pub async fn execute(&self, request: SyncRequest) -> Result<SyncResponse, RestError> {
        match request {
            SyncRequest::Conversations => Ok(SyncResponse::Conversations(self.conversations().await?)),
            SyncRequest::History { peer, limit, offset } => {
                let messages = self.history(peer, limit, offset).await?;
                Ok(SyncResponse::History { peer, messages })
            },
            SyncRequest::MarkRead { peer } => {
                self.mark_read(peer).await?;
                Ok(SyncResponse::MarkedRead { peer })
            },
            SyncRequest::Users => Ok(SyncResponse::Users(self.users().await?)),
        }
    }

    /// `GET messages/conversations`
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, RestError> {
        let url = self.base.join("messages/conversations")?;
        self.get(url).await
    }

    /// `GET messages/history?user_id&limit&offset`
    pub async fn history(&self, peer: u64, limit: usize, offset: usize) -> Result<Vec<ChatMessage>, RestError> {
        let mut url = self.base.join("messages/history")?;
        url.query_pairs_mut()
            .append_pair("user_id", &peer.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        self.get(url).await
    }

    /// `POST messages/mark-read`
    pub async fn mark_read(&self, peer: u64) -> Result<(), RestError> {
        let url = self.base.join("messages/mark-read")?;
        let response =
            self.client.post(url).bearer_auth(&self.token).json(&MarkReadRequest { user_id: peer }).send().await?;
        check(response).await.map(|_| ())
    }

    /// `GET messages/users`
    pub async fn users(&self) -> Result<Vec<UserSummary>, RestError> {
        let url = self.base.join("messages/users")?;
        self.get(url).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, RestError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        let body = check(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check(response: reqwest::Response) -> Result<String, RestError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(RestError::Unauthorized);
    }
    let body = response.text().await?;
    if !status.is_success() {
        return Err(RestError::Status { status: status.as_u16(), body });
    }
    Ok(body)
}
