//! Command-line client for Parlor chat.
//!
//! Wires the generic [`parlor_app::Runtime`] to real I/O:
//! - [`TokioDriver`]: WebSocket, REST and stdin on tokio
//! - [`TerminalAdapter`]: line-oriented output
//!
//! Input is one line per command; see [`commands`] for the syntax.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod driver;
pub mod terminal;

pub use commands::{Command, CommandError};
pub use driver::{DriverError, TokioDriver};
pub use terminal::TerminalAdapter;
