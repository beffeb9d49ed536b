//! # Dispatcher: orchestrates retry wrappers, fan-out delivery, and graceful shutdown.
//!
//! The [`Dispatcher`] owns the event bus, a [`SubscriberSet`], and the global
//! runtime configuration. Per batch it builds an [`Admission`], spawns one
//! supervised retry wrapper per occupied slot, handles OS signals, and drains
//! wrappers within a grace window on shutdown.
//!
//! ## Key responsibilities
//! - subscribe to the [`Bus`] and **fan-out** events via [`SubscriberSet`]
//! - seed the backlog and keep exactly `min(cap, remaining)` wrappers alive
//! - spawn a successor wrapper whenever a finished one hands a task over
//! - handle OS termination signals (SIGINT/SIGTERM/Ctrl-C)
//! - perform graceful shutdown with a configurable [`DispatchConfig::grace`]
//!
//! ## Flow
//! ```text
//! run(unit, ids):
//!   admission.admit_initial() ──► JoinSet::spawn(wrapper.run()) × min(cap, n)
//!
//!   loop select {
//!     signal  ──► publish ShutdownRequested, token.cancel()
//!                 ──► drain joins under grace ──► AllStoppedWithin / GraceExceeded
//!     joined  ──► Done{next: Some(id)} ──► spawn successor wrapper
//!                 Done{next: None}     ──► slot retired
//!                 Cancelled{task}      ──► task recorded as pending
//!                 panic                ──► resumed on the caller
//!   }
//!
//!   all joined ──► gate fired ──► Ok(BatchSummary)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use batchvisor::{DispatchConfig, Dispatcher, FlakyUnit, TaskId};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = DispatchConfig::default();
//!     cfg.max_concurrent = 2;
//!
//!     let dispatcher = Dispatcher::new(cfg, Vec::new());
//!     let unit = Arc::new(FlakyUnit::new(1.0));
//!
//!     let summary = dispatcher.run(unit, TaskId::sequence(3)).await?;
//!     assert_eq!(summary.total, 3);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
    work::{TaskId, UnitRef},
};

use super::{
    active::ActiveTracker, admission::Admission, config::DispatchConfig, shutdown,
    wrapper::{RetryWrapper, WrapperExit},
};

/// Final accounting of a fully completed batch.
#[derive(Clone, Copy, Debug)]
pub struct BatchSummary {
    /// Number of tasks in the batch; all of them succeeded.
    pub total: usize,
    /// Attempts across all tasks (`>= total`).
    pub attempts: u64,
    /// Wall time from backlog seeding to the completion signal.
    pub elapsed: Duration,
}

/// Running totals while a batch is in flight.
#[derive(Default)]
struct Tally {
    completed: usize,
    attempts: u64,
    yielded: Vec<TaskId>,
}

/// Coordinates retry wrappers, event delivery (via [`SubscriberSet`]), and
/// graceful shutdown.
pub struct Dispatcher {
    /// Global runtime configuration.
    pub cfg: DispatchConfig,
    /// Event bus shared with all wrappers.
    pub bus: Bus,
    /// Fan-out set for subscribers.
    subs: Arc<SubscriberSet>,
    /// Slot tracker fed by the listener; source of stuck-task snapshots.
    tracker: Arc<ActiveTracker>,
    /// The bus listener is spawned once per dispatcher, on first `run`.
    listener_started: AtomicBool,
}

impl Dispatcher {
    /// Creates a new dispatcher with the given config and subscribers.
    ///
    /// Must be called from within a Tokio runtime: subscriber workers are
    /// spawned here.
    pub fn new(cfg: DispatchConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        Self {
            cfg,
            bus,
            subs,
            tracker: Arc::new(ActiveTracker::new()),
            listener_started: AtomicBool::new(false),
        }
    }

    /// Runs one batch of tasks through the work unit until every task has
    /// succeeded, or until a termination signal interrupts the run.
    ///
    /// Task ids are admitted in iteration order, at most
    /// [`DispatchConfig::max_concurrent`] at a time. Each admitted task is
    /// retried until success; the batch completes when the last task
    /// succeeds, observable as a single `BatchCompleted` event.
    ///
    /// ### Returns
    /// - `Ok(BatchSummary)` — every task succeeded
    /// - `Err(RuntimeError::Interrupted)` — a signal stopped the run; the
    ///   unfinished tasks are listed in `pending`
    /// - `Err(RuntimeError::GraceExceeded)` — wrappers did not stop within
    ///   the grace window after a signal
    ///
    /// ### Panics
    /// A panic inside the work unit is resumed on the caller: losing a
    /// wrapper without releasing its slot would stall the batch, so it is
    /// treated as fatal.
    pub async fn run(
        &self,
        unit: UnitRef,
        tasks: impl IntoIterator<Item = TaskId>,
    ) -> Result<BatchSummary, RuntimeError> {
        self.subscriber_listener();

        let token = CancellationToken::new();
        let admission = Admission::new(self.cfg.concurrency_limit(), tasks, self.bus.clone());

        let mut set: JoinSet<WrapperExit> = JoinSet::new();
        for id in admission.admit_initial().await {
            self.spawn_wrapper(&mut set, &unit, id, &admission, &token);
        }

        self.drive(&mut set, &unit, &admission, &token).await
    }

    /// Subscribes to the bus, updates the slot tracker, and forwards events
    /// to the subscriber set (fire-and-forget).
    ///
    /// Spawned once per dispatcher; later `run` calls reuse the same
    /// listener. Lagging behind the bus skips events instead of killing the
    /// listener.
    fn subscriber_listener(&self) {
        if self.listener_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        let tracker = Arc::clone(&self.tracker);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        tracker.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Spawns a supervised retry wrapper for one admitted task.
    fn spawn_wrapper(
        &self,
        set: &mut JoinSet<WrapperExit>,
        unit: &UnitRef,
        task: TaskId,
        admission: &Arc<Admission>,
        token: &CancellationToken,
    ) {
        let wrapper = RetryWrapper::new(
            Arc::clone(unit),
            task,
            Arc::clone(admission),
            self.bus.clone(),
            self.cfg.attempt_timeout(),
        );
        set.spawn(wrapper.run(token.clone()));
    }

    /// Supervises wrapper exits until the batch finishes or a signal arrives.
    async fn drive(
        &self,
        set: &mut JoinSet<WrapperExit>,
        unit: &UnitRef,
        admission: &Arc<Admission>,
        token: &CancellationToken,
    ) -> Result<BatchSummary, RuntimeError> {
        let mut tally = Tally::default();

        let signal = shutdown::wait_for_shutdown_signal();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    self.bus.publish(Event::new(EventKind::ShutdownRequested));
                    token.cancel();
                    return self.wait_all_with_grace(set, unit, admission, token, tally).await;
                }
                joined = set.join_next() => {
                    match joined {
                        None => break,
                        Some(res) => {
                            let exit = unwrap_join(res);
                            self.apply_exit(exit, set, unit, admission, token, &mut tally);
                        }
                    }
                }
            }
        }

        assert!(
            admission.is_completed(),
            "all wrappers exited but the batch never completed"
        );
        Ok(BatchSummary {
            total: tally.completed,
            attempts: tally.attempts,
            elapsed: admission.elapsed(),
        })
    }

    /// Tallies one wrapper exit and spawns the successor, if any.
    fn apply_exit(
        &self,
        exit: WrapperExit,
        set: &mut JoinSet<WrapperExit>,
        unit: &UnitRef,
        admission: &Arc<Admission>,
        token: &CancellationToken,
        tally: &mut Tally,
    ) {
        match exit {
            WrapperExit::Done { next, attempts, .. } => {
                tally.completed += 1;
                tally.attempts += u64::from(attempts);
                if let Some(id) = next {
                    self.spawn_wrapper(set, unit, id, admission, token);
                }
            }
            WrapperExit::Cancelled { task, attempts } => {
                tally.attempts += u64::from(attempts);
                tally.yielded.push(task);
            }
        }
    }

    /// Drains remaining wrappers within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on overrun and returns
    /// [`RuntimeError::GraceExceeded`] with the list of stuck tasks.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<WrapperExit>,
        unit: &UnitRef,
        admission: &Arc<Admission>,
        token: &CancellationToken,
        mut tally: Tally,
    ) -> Result<BatchSummary, RuntimeError> {
        let grace = self.cfg.grace;
        let drained = tokio::time::timeout(grace, async {
            while let Some(res) = set.join_next().await {
                let exit = unwrap_join(res);
                self.apply_exit(exit, set, unit, admission, token, &mut tally);
            }
        })
        .await;

        match drained {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                if admission.is_completed() {
                    // The last task finished as the signal arrived.
                    Ok(BatchSummary {
                        total: tally.completed,
                        attempts: tally.attempts,
                        elapsed: admission.elapsed(),
                    })
                } else {
                    let mut pending = tally.yielded;
                    pending.extend(admission.drain_pending().await);
                    pending.sort_unstable();
                    Err(RuntimeError::Interrupted {
                        completed: tally.completed,
                        pending,
                    })
                }
            }
            Err(_elapsed) => {
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_timeout(grace));
                let stuck = self.tracker.snapshot().await;
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Unpacks a wrapper join result; a vanished wrapper is fatal.
fn unwrap_join(res: Result<WrapperExit, JoinError>) -> WrapperExit {
    match res {
        Ok(exit) => exit,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => panic!("retry wrapper aborted: {e}"),
    }
}
