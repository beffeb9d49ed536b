//! # Run a single attempt of a work unit.
//!
//! Executes one attempt of a [`WorkUnit`] with optional timeout, publishing
//! outcome events to the [`Bus`].
//!
//! - **Execute ONE attempt** of the unit with a child cancellation token
//! - **Apply timeout** if configured (wraps execution in `tokio::time::timeout`)
//! - **Publish events** for observability (succeeded/failed/timed out)
//!
//! ## Event flow
//! ```text
//! Success:
//!   unit.attempt() → Ok(()) → publish TaskSucceeded
//!
//! Failure:
//!   unit.attempt() → Err(Fail) → publish AttemptFailed
//!
//! Timeout:
//!   timeout exceeded → cancel child → publish AttemptTimedOut
//!                                   → return Timeout error
//!
//! Cancellation:
//!   unit.attempt() → Err(Canceled) → no event (the wrapper reports the release)
//! ```
//!
//! ## Rules
//! - Publishes **exactly one** outcome event per attempt, except cancellation
//! - A timed-out attempt is an ordinary failure for the retry loop
//! - Derives a **child token** per attempt (isolated cancellation)
//! - Child cancellation does **not** affect the parent

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    work::{TaskId, WorkUnit},
};

/// Executes a single attempt of `unit`, publishing outcome events to `bus`.
///
/// ### Flow
/// 1. Derive a child cancellation token from the parent
/// 2. Execute the unit with an optional timeout wrapper
/// 3. Publish the outcome event based on the result
///
/// ### Timeout behavior
/// If `timeout` is `Some(dur)` and `dur > 0`:
/// - Wraps execution in `tokio::time::timeout`
/// - On timeout: cancels the child token, publishes `AttemptTimedOut`,
///   returns `Timeout` error
///
/// ### Cancellation semantics
/// - Parent cancellation propagates to the child token
/// - The unit **should** return `Err(TaskError::Canceled)` when it detects
///   cancellation
/// - `Canceled` publishes nothing here; the retry wrapper reports the slot
///   release
pub(super) async fn run_once(
    unit: &dyn WorkUnit,
    task: TaskId,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    attempt: u32,
    bus: &Bus,
) -> Result<(), TaskError> {
    let child = parent.child_token();

    let res = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, unit.attempt(task, child.clone())).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                publish_timeout(bus, task, dur, attempt);
                Err(TaskError::Timeout { timeout: dur })
            }
        }
    } else {
        unit.attempt(task, child.clone()).await
    };

    match res {
        Ok(()) => {
            publish_succeeded(bus, task, attempt);
            Ok(())
        }
        Err(TaskError::Canceled) => Err(TaskError::Canceled),
        Err(e) => {
            publish_failed(bus, task, attempt, &e);
            Err(e)
        }
    }
}

/// Publishes `TaskSucceeded` (terminal for the task).
fn publish_succeeded(bus: &Bus, task: TaskId, attempt: u32) {
    bus.publish(
        Event::new(EventKind::TaskSucceeded)
            .with_task(task)
            .with_attempt(attempt),
    );
}

/// Publishes `AttemptFailed` with error details.
fn publish_failed(bus: &Bus, task: TaskId, attempt: u32, err: &TaskError) {
    bus.publish(
        Event::new(EventKind::AttemptFailed)
            .with_task(task)
            .with_attempt(attempt)
            .with_reason(err.to_string()),
    );
}

/// Publishes `AttemptTimedOut` (the attempt still counts as failed).
fn publish_timeout(bus: &Bus, task: TaskId, dur: Duration, attempt: u32) {
    bus.publish(
        Event::new(EventKind::AttemptTimedOut)
            .with_task(task)
            .with_timeout(dur)
            .with_attempt(attempt),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkFn;

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn test_success_publishes_task_succeeded() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let unit = WorkFn::new(|_: TaskId, _: CancellationToken| async { Ok(()) });

        let res = run_once(
            &unit,
            TaskId(1),
            &CancellationToken::new(),
            None,
            3,
            &bus,
        )
        .await;
        assert!(res.is_ok());

        let evs = drain(&mut rx);
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].kind, EventKind::TaskSucceeded);
        assert_eq!(evs[0].task, Some(TaskId(1)));
        assert_eq!(evs[0].attempt, Some(3));
    }

    #[tokio::test]
    async fn test_failure_publishes_attempt_failed() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let unit =
            WorkFn::new(|_: TaskId, _: CancellationToken| async { Err(TaskError::fail("boom")) });

        let res = run_once(
            &unit,
            TaskId(2),
            &CancellationToken::new(),
            None,
            1,
            &bus,
        )
        .await;
        assert!(res.is_err());

        let evs = drain(&mut rx);
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].kind, EventKind::AttemptFailed);
        assert!(evs[0].reason.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_timeout_publishes_attempt_timed_out() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let unit = WorkFn::new(|_: TaskId, _: CancellationToken| async {
            time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });

        let res = run_once(
            &unit,
            TaskId(3),
            &CancellationToken::new(),
            Some(Duration::from_millis(20)),
            2,
            &bus,
        )
        .await;
        assert!(matches!(res, Err(TaskError::Timeout { .. })));

        let evs = drain(&mut rx);
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].kind, EventKind::AttemptTimedOut);
        assert_eq!(evs[0].timeout_ms, Some(20));
    }

    #[tokio::test]
    async fn test_cancellation_publishes_nothing() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let unit = WorkFn::new(|_: TaskId, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });

        let parent = CancellationToken::new();
        parent.cancel();
        let res = run_once(&unit, TaskId(4), &parent, None, 1, &bus).await;
        assert!(matches!(res, Err(TaskError::Canceled)));
        assert!(drain(&mut rx).is_empty());
    }
}
