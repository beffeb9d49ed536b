//! # Runtime events emitted by the dispatcher and retry wrappers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Batch lifecycle events**: task flow (admitted, attempt started/failed, succeeded)
//! - **Terminal events**: batch completion
//! - **Shutdown events**: signal observed, drain outcome
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! reasons, and attempt counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use batchvisor::{Event, EventKind, TaskId};
//!
//! let ev = Event::new(EventKind::AttemptFailed)
//!     .with_task(TaskId(7))
//!     .with_attempt(3)
//!     .with_reason("connection reset");
//!
//! assert_eq!(ev.kind, EventKind::AttemptFailed);
//! assert_eq!(ev.task, Some(TaskId(7)));
//! assert_eq!(ev.reason.as_deref(), Some("connection reset"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::work::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed).
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// All in-flight tasks stopped within the configured grace period.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AllStoppedWithin,

    /// Grace period exceeded; some tasks did not stop in time.
    ///
    /// Sets:
    /// - `timeout_ms`: configured grace period (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GraceExceeded,

    // === Batch lifecycle events ===
    /// Task left the backlog and now holds an execution slot.
    ///
    /// Sets:
    /// - `task`: task id
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskAdmitted,

    /// Task is starting an attempt.
    ///
    /// Sets:
    /// - `task`: task id
    /// - `attempt`: attempt number (1-based, per task)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AttemptStarted,

    /// Attempt failed; the task will be retried on the same slot.
    ///
    /// Sets:
    /// - `task`: task id
    /// - `attempt`: attempt number
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AttemptFailed,

    /// Attempt exceeded the configured per-attempt timeout.
    ///
    /// Sets:
    /// - `task`: task id
    /// - `attempt`: attempt number
    /// - `timeout_ms`: configured attempt timeout (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AttemptTimedOut,

    /// Task succeeded and released its slot.
    ///
    /// Sets:
    /// - `task`: task id
    /// - `attempt`: attempt count at success
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskSucceeded,

    /// Task gave its slot back without completing (cancelled during shutdown).
    ///
    /// The task is still pending; a future run would have to dispatch it again.
    ///
    /// Sets:
    /// - `task`: task id
    /// - `attempt`: attempts made before the release
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskReleased,

    // === Batch terminal ===
    /// Every task in the batch has succeeded. Published exactly once per run.
    ///
    /// Sets:
    /// - `elapsed_ms`: wall time from first admission (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    BatchCompleted,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Attempt timeout or grace period in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Batch wall time in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Id of the task, if applicable.
    pub task: Option<TaskId>,
    /// Name of the subscriber, for subscriber meta-events.
    pub subscriber: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            attempt: None,
            timeout_ms: None,
            elapsed_ms: None,
            reason: None,
            task: None,
            subscriber: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Attaches a subscriber name.
    #[inline]
    pub fn with_subscriber(mut self, name: impl Into<Arc<str>>) -> Self {
        self.subscriber = Some(name.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a batch wall time (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_subscriber(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subscriber(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TaskAdmitted);
        let b = Event::new(EventKind::TaskAdmitted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::AttemptTimedOut)
            .with_task(TaskId(3))
            .with_attempt(2)
            .with_timeout(Duration::from_millis(250));

        assert_eq!(ev.task, Some(TaskId(3)));
        assert_eq!(ev.attempt, Some(2));
        assert_eq!(ev.timeout_ms, Some(250));
        assert!(ev.reason.is_none());
    }

    #[test]
    fn test_timeout_saturates_at_u32_max() {
        let ev = Event::new(EventKind::GraceExceeded).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn test_meta_event_guards() {
        let over = Event::subscriber_overflow("log", "full");
        assert!(over.is_subscriber_overflow());
        assert!(!over.is_subscriber_panic());
        assert_eq!(over.subscriber.as_deref(), Some("log"));

        let panic = Event::subscriber_panicked("log", "boom".to_string());
        assert!(panic.is_subscriber_panic());
    }
}
