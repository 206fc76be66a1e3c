//! Core session mechanics for Parlor.
//!
//! Pure state machines for the transport side of the chat session. Nothing in
//! this crate performs I/O: methods take the current time as input and return
//! actions for a driver to execute, so every timer and retry path can be
//! tested with a virtual clock.
//!
//! # Components
//!
//! - [`Connection`]: socket lifecycle, exponential backoff, heartbeat and
//!   liveness timeouts
//! - [`OutboundQueue`]: FIFO of frames composed while the socket is not open
//! - [`Environment`]: time source abstraction (real or simulated)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
pub mod queue;

pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, ConnectionStatus,
    backoff_delay,
};
pub use env::{Environment, Moment};
pub use error::ConnectionError;
pub use queue::{OutboundFrame, OutboundQueue, QueueConfig};
