//! # Work-unit abstraction and task identity.
//!
//! This module defines [`TaskId`] (the opaque identity of one backlog task)
//! and the [`WorkUnit`] trait (async, cancelable, invoked once per attempt).
//! The common handle type is [`UnitRef`], an `Arc<dyn WorkUnit>` shared by
//! every retry wrapper in a batch.
//!
//! A work unit receives a [`CancellationToken`] and should check it during
//! long suspensions so shutdown can interrupt an in-flight attempt.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Opaque identity of one backlog task.
///
/// The dispatcher never interprets the value; it only moves ids from the
/// backlog into retry wrappers and reports them in events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Returns the ids `0..count`, the usual shape of a demo batch.
    ///
    /// # Example
    /// ```
    /// use batchvisor::TaskId;
    ///
    /// let ids: Vec<TaskId> = TaskId::sequence(3).collect();
    /// assert_eq!(ids, vec![TaskId(0), TaskId(1), TaskId(2)]);
    /// ```
    pub fn sequence(count: usize) -> impl Iterator<Item = TaskId> {
        (0..count as u64).map(TaskId)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        TaskId(id)
    }
}

/// Shared handle to a work unit (`Arc<dyn WorkUnit>`).
pub type UnitRef = Arc<dyn WorkUnit>;

/// # One abstract asynchronous operation with a success/failure outcome.
///
/// The dispatcher invokes [`attempt`](WorkUnit::attempt) once per attempt,
/// for any task id, possibly many times for the same id. Implementations
/// must tolerate repeated invocation and must not touch dispatcher state —
/// the only thing the runtime observes is the returned result.
///
/// An attempt may suspend for an arbitrary duration. Return
/// [`TaskError::Canceled`] when the token fires mid-attempt so shutdown
/// stays prompt; returning any other error schedules another attempt.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use batchvisor::{TaskError, TaskId, WorkUnit};
///
/// struct Ping;
///
/// #[async_trait]
/// impl WorkUnit for Ping {
///     async fn attempt(&self, task: TaskId, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // call out, poke hardware, etc.
///         let _ = task;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait WorkUnit: Send + Sync + 'static {
    /// Executes one attempt for the given task.
    async fn attempt(&self, task: TaskId, ctx: CancellationToken) -> Result<(), TaskError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_yields_increasing_ids() {
        let ids: Vec<TaskId> = TaskId::sequence(5).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids.first(), Some(&TaskId(0)));
        assert_eq!(ids.last(), Some(&TaskId(4)));
    }

    #[test]
    fn test_display_is_bare_number() {
        assert_eq!(TaskId(42).to_string(), "42");
    }
}
