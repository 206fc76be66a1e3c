//! Client-side chat session for Parlor.
//!
//! Action-based session layer on top of the `parlor-core` state machines:
//! inbound routing, conversation and presence state, and the session object
//! that ties them to the connection lifecycle.
//!
//! # Components
//!
//! - [`Session`]: the single entry point; events in, actions out
//! - [`Router`]: kind → handler lookup table for server pushes
//! - [`ChatState`]: conversations, presence, active conversation, typing
//! - [`AuthProvider`]: credentials collaborator
//!
//! With the `transport` feature, `transport` (tokio-tungstenite) and `rest`
//! (reqwest) provide the production I/O the session's actions ask for.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod conversation;
pub mod error;
pub mod event;
pub mod router;
pub mod session;
pub mod state;

#[cfg(feature = "transport")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod transport;

pub use auth::{AuthProvider, Credentials};
pub use conversation::Conversation;
pub use error::SessionError;
pub use event::{RenderTarget, SessionAction, SessionEvent, SyncRequest, SyncResponse};
pub use router::{Handler, Router};
pub use session::{Session, SessionConfig};
pub use state::{ChatState, StateConfig};
