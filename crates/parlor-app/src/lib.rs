//! Application layer for Parlor.
//!
//! Generic runtime that wires a [`parlor_client::Session`] to real or
//! simulated I/O, so deterministic simulation tests exercise the same
//! orchestration code that runs in production.
//!
//! # Components
//!
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`UiAdapter`]: Render callbacks
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`SystemEnv`]: Production time source

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod runtime;
mod system_env;
mod ui;

pub use driver::Driver;
pub use runtime::Runtime;
pub use system_env::SystemEnv;
pub use ui::UiAdapter;
