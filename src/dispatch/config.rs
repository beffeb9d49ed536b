//! # Global dispatcher configuration.
//!
//! Provides [`DispatchConfig`], the centralized settings for a batch run.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (every backlog item admitted up front)
//! - `timeout = 0s` → no per-attempt timeout
//! - `bus_capacity` is clamped to a minimum of 1 by the bus
//!
//! Prefer the helper accessors ([`DispatchConfig::concurrency_limit`],
//! [`DispatchConfig::attempt_timeout`]) over checking sentinels inline.

use std::time::Duration;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
///
/// Defines:
/// - **Concurrency cap**: how many retry wrappers may be active at once
/// - **Event system**: bus capacity for event delivery
/// - **Shutdown behavior**: grace window for draining wrappers on a signal
/// - **Attempt timeout**: optional cap on a single work-unit invocation
///
/// ## Field semantics
/// - `max_concurrent`: slot count (`0` = unlimited)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
/// - `grace`: maximum wait for wrappers to stop after a shutdown signal
/// - `timeout`: per-attempt cap (`0s` = none); an elapsed timeout counts as
///   a failed attempt and is retried like any other failure
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Maximum number of retry wrappers active at once.
    ///
    /// - `0` = unlimited (the whole backlog is admitted immediately)
    /// - `n > 0` = at most `n` wrappers run simultaneously
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items. Minimum value is 1 (enforced by the
    /// bus).
    pub bus_capacity: usize,

    /// Maximum time to wait for wrappers to drain after a shutdown signal.
    ///
    /// When a termination signal is received:
    /// - wrappers are cancelled via `CancellationToken`
    /// - the dispatcher waits up to `grace` for them to exit
    /// - on overrun it returns `RuntimeError::GraceExceeded`
    pub grace: Duration,

    /// Per-attempt timeout for the work unit.
    ///
    /// - `Duration::ZERO` = no timeout (an attempt runs until it resolves)
    /// - `> 0` = the attempt is cancelled and counted as failed once the
    ///   timeout elapses
    pub timeout: Duration,
}

impl DispatchConfig {
    /// Returns the concurrency cap as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` concurrent wrappers
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the per-attempt timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per attempt
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for DispatchConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    /// - `timeout = 0s` (no attempt timeout)
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
            timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sentinels() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.concurrency_limit(), None);
        assert_eq!(cfg.attempt_timeout(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
    }

    #[test]
    fn test_concurrency_limit_set() {
        let cfg = DispatchConfig {
            max_concurrent: 5,
            ..Default::default()
        };
        assert_eq!(cfg.concurrency_limit(), Some(5));
    }

    #[test]
    fn test_attempt_timeout_set() {
        let cfg = DispatchConfig {
            timeout: Duration::from_millis(250),
            ..Default::default()
        };
        assert_eq!(cfg.attempt_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_bus_capacity_clamped_to_one() {
        let cfg = DispatchConfig {
            bus_capacity: 0,
            ..Default::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
