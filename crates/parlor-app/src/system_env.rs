//! Production Environment implementation using system time.
//!
//! Real `std::time::Instant` for timers, tokio sleep for delays and the
//! system wall clock for frame timestamps. Behaviour is non-deterministic by
//! nature; tests use a virtual clock instead.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parlor_core::Environment;

/// Production environment using system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_never_goes_backwards() {
        let env = SystemEnv::new();
        let t1 = env.now();
        let t2 = env.now();
        assert!(t2 >= t1);
    }

    #[tokio::test]
    async fn sleep_waits() {
        let env = SystemEnv::new();
        let start = env.now();
        env.sleep(Duration::from_millis(5)).await;
        assert!(env.now() - start >= Duration::from_millis(5));
    }
}
