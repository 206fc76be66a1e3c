//! Deterministic simulation harness for the Parlor chat session.
//!
//! In-memory implementations of the [`parlor_app::Driver`] and
//! [`parlor_core::Environment`] traits, so the same generic runtime that runs
//! the terminal client runs here against a virtual clock and a scripted
//! server.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after every
//! event, whatever the event sequence. [`Simulation`] captures a
//! [`SessionSnapshot`] and runs the [`InvariantRegistry`] against it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod recording_ui;
pub mod sim_driver;
pub mod sim_env;
pub mod simulation;

pub use invariants::{
    ActiveConversationRead, ConversationSnapshot, HistoryOrdered, Invariant, InvariantRegistry,
    InvariantResult, PresenceMirrored, SessionSnapshot, TimersExclusive, Violation,
};
pub use recording_ui::{RecordingAdapter, UiCall};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
pub use simulation::Simulation;
