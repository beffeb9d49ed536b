//! # Function-backed work unit (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn(TaskId, CancellationToken) -> Fut`,
//! producing a fresh future per attempt. Shared state across attempts goes
//! through an explicit `Arc<...>` inside the closure, never hidden mutation.
//!
//! This is the workhorse for tests and demos: deterministic stubs
//! ("fail twice, then succeed") are one closure away.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use batchvisor::{TaskError, TaskId, UnitRef, WorkFn};
//!
//! let unit: UnitRef = WorkFn::arc(|task: TaskId, _ctx: CancellationToken| async move {
//!     if task.0 % 2 == 0 {
//!         Ok(())
//!     } else {
//!         Err(TaskError::fail("odd ids are unlucky"))
//!     }
//! });
//! # let _ = unit;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::work::unit::{TaskId, WorkUnit};

/// Function-backed work-unit implementation.
///
/// Wraps a closure that *creates* a new future per attempt.
#[derive(Debug)]
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates a new function-backed work unit.
    ///
    /// Prefer [`WorkFn::arc`] when you immediately need a [`UnitRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the unit and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> WorkUnit for WorkFn<F>
where
    F: Fn(TaskId, CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn attempt(&self, task: TaskId, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.f)(task, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_sees_task_id() {
        let unit = WorkFn::new(|task: TaskId, _ctx: CancellationToken| async move {
            if task == TaskId(7) {
                Ok(())
            } else {
                Err(TaskError::fail("wrong id"))
            }
        });

        let token = CancellationToken::new();
        assert!(unit.attempt(TaskId(7), token.clone()).await.is_ok());
        assert!(unit.attempt(TaskId(8), token).await.is_err());
    }

    #[tokio::test]
    async fn test_fresh_future_per_attempt() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let calls = Arc::new(AtomicU32::new(0));
        let unit = {
            let calls = calls.clone();
            WorkFn::new(move |_task: TaskId, _ctx: CancellationToken| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            })
        };

        let token = CancellationToken::new();
        for _ in 0..3 {
            unit.attempt(TaskId(0), token.clone()).await.unwrap();
        }
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }
}
