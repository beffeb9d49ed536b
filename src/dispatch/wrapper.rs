//! # RetryWrapper: single-task retry loop.
//!
//! Supervises execution of one task inside its slot:
//! - attempts the [`WorkUnit`] until it succeeds (no backoff, no attempt cap),
//! - applies an optional per-attempt timeout,
//! - cooperative cancellation via [`CancellationToken`],
//! - releases the slot through [`Admission`] exactly once on exit.
//!
//! ## Event flow
//! For each attempt, the wrapper publishes:
//! ```text
//! AttemptStarted → [unit execution] → TaskSucceeded   (success, exit)
//!                                   → AttemptTimedOut (timeout, retry)
//!                                   → AttemptFailed   (error, retry)
//!
//! On cancellation:
//!   → TaskReleased (task still pending, exit)
//! ```
//!
//! ## Architecture
//! ```text
//! Dispatcher ──► JoinSet::spawn(wrapper.run(token))
//!
//! loop {
//!   ├─► token cancelled? ──► publish TaskReleased, admission.release(), exit
//!   ├─► attempt += 1
//!   ├─► publish AttemptStarted
//!   ├─► run_once() ─────► unit.attempt()
//!   │       │
//!   │     Ok ──► admission.complete() ──► exit with optional successor
//!   │       │
//!   │     Err(Canceled) ──► release slot, exit (only during shutdown)
//!   │       │
//!   │     Err(other) ──► continue (retry immediately)
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** within one wrapper (never parallel)
//! - The attempt counter **increments on each invocation** (never resets)
//! - The slot is released exactly once: via `complete()` on success or
//!   `release()` on cancellation
//! - A `Canceled` result while the runtime token is still live counts as an
//!   ordinary failed attempt; only shutdown lets a task exit unfinished

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    work::{TaskId, UnitRef},
};

use super::{admission::Admission, runner::run_once};

/// How a retry wrapper left its slot.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum WrapperExit {
    /// The task succeeded. `next` is a waiting task admitted in the same
    /// atomic step, to be spawned by the dispatcher.
    Done {
        task: TaskId,
        next: Option<TaskId>,
        attempts: u32,
    },
    /// Shutdown interrupted the task before it succeeded.
    Cancelled { task: TaskId, attempts: u32 },
}

/// Runs one admitted task until success or shutdown.
pub(super) struct RetryWrapper {
    /// Work unit shared by the whole batch.
    pub unit: UnitRef,
    /// Task this wrapper owns.
    pub task: TaskId,
    /// Shared slot accounting; released exactly once on exit.
    pub admission: Arc<Admission>,
    /// Internal event bus (used to publish lifecycle events).
    pub bus: Bus,
    /// Optional per-attempt timeout (`None` = no timeout).
    pub timeout: Option<Duration>,
}

impl RetryWrapper {
    /// Creates a wrapper for one admitted task.
    pub fn new(
        unit: UnitRef,
        task: TaskId,
        admission: Arc<Admission>,
        bus: Bus,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            unit,
            task,
            admission,
            bus,
            timeout,
        }
    }

    /// Runs the retry loop until the task succeeds or shutdown interrupts it.
    ///
    /// ### Exit conditions
    /// - Unit returns `Ok` → slot handed over via [`Admission::complete`],
    ///   exits with `WrapperExit::Done`
    /// - `runtime_token` cancelled (checked between attempts and honored
    ///   mid-attempt when the unit returns `Canceled`) → slot freed via
    ///   [`Admission::release`], exits with `WrapperExit::Cancelled`
    ///
    /// ### Retry semantics
    /// Every failure, including a timed-out attempt, schedules the next
    /// attempt immediately. There is no delay between attempts and no cap on
    /// their number; with a unit that can never succeed the wrapper runs
    /// until shutdown.
    pub async fn run(self, runtime_token: CancellationToken) -> WrapperExit {
        let mut attempt: u32 = 0;

        loop {
            if runtime_token.is_cancelled() {
                return self.cancel_exit(attempt).await;
            }

            attempt += 1;
            self.bus.publish(
                Event::new(EventKind::AttemptStarted)
                    .with_task(self.task)
                    .with_attempt(attempt),
            );
            let res = run_once(
                self.unit.as_ref(),
                self.task,
                &runtime_token,
                self.timeout,
                attempt,
                &self.bus,
            )
            .await;

            match res {
                Ok(()) => {
                    let next = self.admission.complete(&runtime_token).await;
                    return WrapperExit::Done {
                        task: self.task,
                        next,
                        attempts: attempt,
                    };
                }
                Err(TaskError::Canceled) if runtime_token.is_cancelled() => {
                    return self.cancel_exit(attempt).await;
                }
                // Unconditional retry: a spurious Canceled outside shutdown
                // is a failure like any other, the task must not be lost.
                Err(_) => continue,
            }
        }
    }

    /// Publishes `TaskReleased` and frees the slot without completing.
    async fn cancel_exit(self, attempts: u32) -> WrapperExit {
        self.bus.publish(
            Event::new(EventKind::TaskReleased)
                .with_task(self.task)
                .with_attempt(attempts),
        );
        self.admission.release().await;
        WrapperExit::Cancelled {
            task: self.task,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::work::WorkFn;

    fn drain_kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    async fn seeded(cap: usize, total: usize, bus: &Bus) -> Arc<Admission> {
        let adm = Admission::new(Some(cap), TaskId::sequence(total), bus.clone());
        adm.admit_initial().await;
        adm
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let adm = seeded(1, 1, &bus).await;

        let unit = WorkFn::arc(|_: TaskId, _: CancellationToken| async { Ok(()) });
        let wrapper = RetryWrapper::new(unit, TaskId(0), Arc::clone(&adm), bus.clone(), None);

        let exit = wrapper.run(CancellationToken::new()).await;
        assert_eq!(
            exit,
            WrapperExit::Done {
                task: TaskId(0),
                next: None,
                attempts: 1
            }
        );
        assert!(adm.is_completed());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskAdmitted,
                EventKind::AttemptStarted,
                EventKind::TaskSucceeded,
                EventKind::BatchCompleted,
            ]
        );
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let adm = seeded(1, 1, &bus).await;

        let calls = Arc::new(AtomicU32::new(0));
        let unit = {
            let calls = Arc::clone(&calls);
            WorkFn::arc(move |_: TaskId, _: CancellationToken| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TaskError::fail("not yet"))
                    } else {
                        Ok(())
                    }
                }
            })
        };
        let wrapper = RetryWrapper::new(unit, TaskId(0), Arc::clone(&adm), bus.clone(), None);

        let exit = wrapper.run(CancellationToken::new()).await;
        assert_eq!(
            exit,
            WrapperExit::Done {
                task: TaskId(0),
                next: None,
                attempts: 3
            }
        );

        let failed = drain_kinds(&mut rx)
            .into_iter()
            .filter(|k| *k == EventKind::AttemptFailed)
            .count();
        assert_eq!(failed, 2);
    }

    #[tokio::test]
    async fn test_success_hands_over_next_task() {
        let bus = Bus::new(64);
        let adm = seeded(1, 2, &bus).await;

        let unit = WorkFn::arc(|_: TaskId, _: CancellationToken| async { Ok(()) });
        let wrapper = RetryWrapper::new(unit, TaskId(0), Arc::clone(&adm), bus.clone(), None);

        let exit = wrapper.run(CancellationToken::new()).await;
        assert_eq!(
            exit,
            WrapperExit::Done {
                task: TaskId(0),
                next: Some(TaskId(1)),
                attempts: 1
            }
        );
        assert!(!adm.is_completed());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let adm = seeded(1, 1, &bus).await;

        let unit = WorkFn::arc(|_: TaskId, _: CancellationToken| async { Ok(()) });
        let wrapper = RetryWrapper::new(unit, TaskId(0), Arc::clone(&adm), bus.clone(), None);

        let token = CancellationToken::new();
        token.cancel();
        let exit = wrapper.run(token).await;
        assert_eq!(
            exit,
            WrapperExit::Cancelled {
                task: TaskId(0),
                attempts: 0
            }
        );
        assert!(!adm.is_completed());
        assert_eq!(adm.active_count().await, 0);
        assert!(drain_kinds(&mut rx).contains(&EventKind::TaskReleased));
    }

    #[tokio::test]
    async fn test_cancelled_mid_attempt() {
        let bus = Bus::new(64);
        let adm = seeded(1, 1, &bus).await;

        let unit = WorkFn::arc(|_: TaskId, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });
        let wrapper = RetryWrapper::new(unit, TaskId(0), Arc::clone(&adm), bus.clone(), None);

        let token = CancellationToken::new();
        let handle = tokio::spawn(wrapper.run(token.clone()));
        tokio::task::yield_now().await;
        token.cancel();

        let exit = handle.await.unwrap();
        assert_eq!(
            exit,
            WrapperExit::Cancelled {
                task: TaskId(0),
                attempts: 1
            }
        );
        assert!(!adm.is_completed());
    }
}
