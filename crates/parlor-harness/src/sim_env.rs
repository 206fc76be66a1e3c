//! Virtual-time environment.
//!
//! Time only moves when a test says so: [`SimEnv::advance`] or an awaited
//! [`Environment::sleep`], which jumps the clock instead of waiting.

use std::{
    future::Future,
    ops::{Add, Sub},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use parlor_core::Environment;

/// Wall-clock time at virtual instant zero (2026-01-01T00:00:00Z).
const EPOCH_SECS: i64 = 1_767_225_600;

/// Instant on the virtual clock: time elapsed since the simulation started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Simulation start.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Time elapsed since the simulation started.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Environment backed by a shared virtual clock.
///
/// Clones share the clock.
#[derive(Clone, Debug, Default)]
pub struct SimEnv {
    nanos: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock at [`SimInstant::ZERO`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(by, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(Duration::from_nanos(self.nanos.load(Ordering::SeqCst)))
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let start = DateTime::<Utc>::from_timestamp(EPOCH_SECS, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let elapsed = chrono::Duration::from_std(self.now().elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        start + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_only_moves_when_advanced() {
        let env = SimEnv::new();
        assert_eq!(env.now(), SimInstant::ZERO);

        env.advance(Duration::from_millis(1500));
        assert_eq!(env.now().elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let other = env.clone();
        other.advance(Duration::from_secs(3));
        assert_eq!(env.now() - SimInstant::ZERO, Duration::from_secs(3));
    }

    #[test]
    fn instants_subtract_saturating() {
        let early = SimInstant::ZERO + Duration::from_secs(1);
        let late = SimInstant::ZERO + Duration::from_secs(5);
        assert_eq!(late - early, Duration::from_secs(4));
        assert_eq!(early - late, Duration::ZERO);
    }

    #[test]
    fn wall_clock_follows_virtual_time() {
        let env = SimEnv::new();
        let before = env.wall_clock();
        env.advance(Duration::from_secs(60));
        assert_eq!((env.wall_clock() - before).num_seconds(), 60);
    }

    #[tokio::test]
    async fn sleep_jumps_the_clock() {
        let env = SimEnv::new();
        env.sleep(Duration::from_secs(30)).await;
        assert_eq!(env.now().elapsed(), Duration::from_secs(30));
    }
}
