//! # Simulated work unit with latency and a random outcome.
//!
//! [`FlakyUnit`] is the reference [`WorkUnit`]: it sleeps for a fixed or
//! uniformly random delay (simulated call latency), then draws success with
//! probability `success_rate`. With any rate in (0, 1] a task converges to
//! success almost surely; the dispatcher never assumes a bounded attempt
//! count.
//!
//! A rate of `0.0` is accepted but never succeeds — the batch containing it
//! will run until shutdown. That is a property of unconditional retry, not a
//! bug in the unit.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::work::unit::{TaskId, WorkUnit};

/// Work unit simulating a latency-bound call with a Bernoulli outcome.
#[derive(Clone, Copy, Debug)]
pub struct FlakyUnit {
    success_rate: f64,
    delay_min: Duration,
    delay_max: Duration,
}

impl FlakyUnit {
    /// Creates a unit with the given success probability and no delay.
    ///
    /// `success_rate` is clamped into `[0.0, 1.0]`.
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
        }
    }

    /// Sets a fixed per-attempt delay.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_delay_range(delay, delay)
    }

    /// Sets a uniformly random per-attempt delay in `[min, max]`.
    ///
    /// The bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn with_delay_range(mut self, min: Duration, max: Duration) -> Self {
        self.delay_min = min.min(max);
        self.delay_max = min.max(max);
        self
    }

    /// Returns the configured success probability.
    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    fn draw_delay(&self) -> Duration {
        if self.delay_min == self.delay_max {
            return self.delay_min;
        }
        let min_ms = self.delay_min.as_millis() as u64;
        let max_ms = self.delay_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

#[async_trait]
impl WorkUnit for FlakyUnit {
    async fn attempt(&self, _task: TaskId, ctx: CancellationToken) -> Result<(), TaskError> {
        let delay = self.draw_delay();
        if !delay.is_zero() {
            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = ctx.cancelled() => return Err(TaskError::Canceled),
            }
        }

        if rand::rng().random_bool(self.success_rate) {
            Ok(())
        } else {
            Err(TaskError::fail("simulated failure"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_one_always_succeeds() {
        let unit = FlakyUnit::new(1.0);
        let token = CancellationToken::new();
        for id in TaskId::sequence(10) {
            assert!(unit.attempt(id, token.clone()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_rate_zero_always_fails() {
        let unit = FlakyUnit::new(0.0);
        let token = CancellationToken::new();
        for id in TaskId::sequence(10) {
            assert!(unit.attempt(id, token.clone()).await.is_err());
        }
    }

    #[test]
    fn test_rate_clamped() {
        assert_eq!(FlakyUnit::new(1.5).success_rate(), 1.0);
        assert_eq!(FlakyUnit::new(-0.5).success_rate(), 0.0);
    }

    #[test]
    fn test_delay_range_bounds_swapped() {
        let unit = FlakyUnit::new(1.0)
            .with_delay_range(Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(unit.delay_min, Duration::from_millis(100));
        assert_eq!(unit.delay_max, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_cancelled_during_delay() {
        let unit = FlakyUnit::new(1.0).with_delay(Duration::from_secs(30));
        let token = CancellationToken::new();
        token.cancel();

        let res = unit.attempt(TaskId(0), token).await;
        assert!(matches!(res, Err(TaskError::Canceled)));
    }
}
