//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system time. Production uses the wall clock
//! and tokio timers; tests use a virtual clock that only moves when told to.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

use chrono::{DateTime, Utc};

/// Monotonic instant usable by the state machines.
///
/// Blanket-implemented for anything with the right arithmetic, so both
/// `std::time::Instant` and virtual instants qualify.
pub trait Moment:
    Copy + Ord + Send + Sync + Debug + Sub<Output = Duration> + Add<Duration, Output = Self>
{
}

impl<T> Moment for T where
    T: Copy + Ord + Send + Sync + Debug + Sub<Output = Duration> + Add<Duration, Output = T>
{
}

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `wall_clock()` is only used for wire timestamps, never for timers
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type of this environment.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual
    /// instant.
    type Instant: Moment;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; state machines never do.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Current wall-clock time, stamped on outbound frames.
    fn wall_clock(&self) -> DateTime<Utc>;
}
