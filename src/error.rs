//! Error types used by the batchvisor runtime and work units.
//!
//! This module defines two error enums:
//!
//! - [`RuntimeError`] — errors raised by the batch run itself (shutdown
//!   before completion, grace window overrun).
//! - [`TaskError`] — errors raised by individual work-unit attempts.
//!
//! A failed attempt is never terminal for its task: the retry wrapper keeps
//! re-invoking the work unit until it succeeds. [`TaskError::Canceled`] is
//! the only attempt outcome that ends a wrapper without success, and it only
//! occurs during shutdown.

use std::time::Duration;
use thiserror::Error;

use crate::work::TaskId;

/// Errors produced by a batch run.
///
/// These represent failures of the run as a whole, not of individual
/// attempts. Both variants are only reachable through the shutdown path:
/// a batch left alone either completes or runs forever.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown was requested before every task succeeded; all wrappers
    /// drained within the grace window but the batch is incomplete.
    #[error("interrupted with {completed} task(s) done; pending: {pending:?}")]
    Interrupted {
        /// Number of tasks that succeeded before the interrupt.
        completed: usize,
        /// Ids that were still pending (active or never admitted).
        pending: Vec<TaskId>,
    },

    /// Shutdown drain exceeded the grace window; some wrappers were still
    /// running and had to be dropped.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of tasks whose wrappers did not stop in time.
        stuck: Vec<TaskId>,
    },
}

/// Errors produced by a single work-unit attempt.
///
/// `Fail` and `Timeout` are expected, retryable outcomes — the wrapper
/// immediately schedules another attempt. `Canceled` means the attempt was
/// interrupted by runtime shutdown and the wrapper exits without success.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The attempt ran to completion and reported failure.
    #[error("attempt failed: {reason}")]
    Fail {
        /// Human-readable failure description.
        reason: String,
    },

    /// The attempt exceeded the configured per-attempt timeout.
    #[error("attempt timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The attempt was cancelled by runtime shutdown.
    #[error("attempt cancelled")]
    Canceled,
}

impl TaskError {
    /// Indicates whether the wrapper should schedule another attempt.
    ///
    /// Returns `true` for [`TaskError::Fail`] and [`TaskError::Timeout`];
    /// `false` for [`TaskError::Canceled`].
    ///
    /// # Example
    /// ```
    /// use batchvisor::TaskError;
    ///
    /// let flaky = TaskError::Fail { reason: "boom".into() };
    /// assert!(flaky.is_retryable());
    ///
    /// assert!(!TaskError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. } | TaskError::Timeout { .. })
    }

    /// Shorthand for a [`TaskError::Fail`] with the given reason.
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }
}
