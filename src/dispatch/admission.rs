//! # Admission: slot accounting and batch-completion detection.
//!
//! [`Admission`] owns the backlog and the active-slot counter behind one lock,
//! so "free a slot, hand it to the next waiting task" is a single atomic step.
//! It is shared (`Arc`) between the dispatcher (initial admissions) and every
//! retry wrapper (slot release on success or cancellation).
//!
//! ## Flow
//! ```text
//! run() ──► admit_initial() ─── pops up to cap ──► TaskAdmitted × n
//!
//! wrapper success ──► complete() ─┬─ next waiting? ──► TaskAdmitted, Some(id)
//!                                 ├─ shutting down? ──► None (no new work)
//!                                 └─ all done?      ──► gate.fire() + BatchCompleted
//!
//! wrapper cancelled ──► release() ──► slot freed, gate untouched
//! ```
//!
//! ## Rules
//! - `active` never exceeds the cap; a violation is a bug and panics.
//! - Slot release without an active task is a bug and panics.
//! - The completion gate fires at most once per batch; `release()` never
//!   fires it (an interrupted batch is not a completed one).
//! - An empty batch completes during `admit_initial()`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::work::TaskId;

use super::{backlog::Backlog, gate::CompletionGate};

/// Backlog and slot counter, guarded together.
struct AdmissionState {
    backlog: Backlog,
    active: usize,
}

/// Shared admission state for one batch run.
pub(super) struct Admission {
    /// Slot count. `usize::MAX` means unlimited.
    cap: usize,
    state: Mutex<AdmissionState>,
    bus: Bus,
    gate: CompletionGate,
    started: Instant,
}

impl Admission {
    /// Creates admission state for one batch, seeding the backlog.
    ///
    /// `limit` follows [`DispatchConfig::concurrency_limit`](super::DispatchConfig::concurrency_limit):
    /// `None` = unlimited.
    pub fn new(
        limit: Option<usize>,
        tasks: impl IntoIterator<Item = TaskId>,
        bus: Bus,
    ) -> Arc<Self> {
        Arc::new(Self {
            cap: limit.unwrap_or(usize::MAX),
            state: Mutex::new(AdmissionState {
                backlog: Backlog::seed(tasks),
                active: 0,
            }),
            bus,
            gate: CompletionGate::new(),
            started: Instant::now(),
        })
    }

    /// Admits up to `cap` tasks from the backlog and returns them.
    ///
    /// Publishes `TaskAdmitted` for each. An empty batch completes right
    /// here: the gate fires and `BatchCompleted` is published before any
    /// wrapper exists.
    pub async fn admit_initial(&self) -> Vec<TaskId> {
        let mut st = self.state.lock().await;

        let mut admitted = Vec::new();
        while st.active < self.cap {
            let Some(id) = st.backlog.pop_or_empty() else {
                break;
            };
            st.active += 1;
            self.bus
                .publish(Event::new(EventKind::TaskAdmitted).with_task(id));
            admitted.push(id);
        }

        if st.active == 0 && st.backlog.is_empty() {
            self.fire_completed();
        }
        admitted
    }

    /// Releases the caller's slot after a task success and hands the slot to
    /// the next waiting task, if any.
    ///
    /// Returns `Some(next)` when a waiting task was admitted in the same
    /// atomic step (its `TaskAdmitted` is already published). Returns `None`
    /// when the backlog is empty or shutdown is in progress.
    ///
    /// When this release empties the system (no active tasks, no backlog),
    /// the completion gate fires and `BatchCompleted` is published, exactly
    /// once per batch.
    pub async fn complete(&self, token: &CancellationToken) -> Option<TaskId> {
        let mut st = self.state.lock().await;

        assert!(st.active > 0, "slot released with no active tasks");
        st.active -= 1;

        if !token.is_cancelled() {
            if let Some(next) = st.backlog.pop_or_empty() {
                st.active += 1;
                assert!(st.active <= self.cap, "admission exceeded concurrency cap");
                self.bus
                    .publish(Event::new(EventKind::TaskAdmitted).with_task(next));
                return Some(next);
            }
        }

        if st.active == 0 && st.backlog.is_empty() {
            self.fire_completed();
        }
        None
    }

    /// Releases the caller's slot without completing its task (cancellation).
    ///
    /// Never admits a replacement and never fires the completion gate: the
    /// released task is still pending, so the batch cannot be complete.
    pub async fn release(&self) {
        let mut st = self.state.lock().await;
        assert!(st.active > 0, "slot released with no active tasks");
        st.active -= 1;
    }

    /// Removes and returns every task still waiting in the backlog.
    ///
    /// Used to report pending work after an interrupted run.
    pub async fn drain_pending(&self) -> Vec<TaskId> {
        self.state.lock().await.backlog.drain()
    }

    /// True once every task in the batch has succeeded.
    pub fn is_completed(&self) -> bool {
        self.gate.is_fired()
    }

    /// Wall time since this batch was seeded.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[cfg(test)]
    pub async fn active_count(&self) -> usize {
        self.state.lock().await.active
    }

    #[cfg(test)]
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.backlog.len()
    }

    fn fire_completed(&self) {
        if self.gate.fire() {
            self.bus
                .publish(Event::new(EventKind::BatchCompleted).with_elapsed(self.elapsed()));
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::task::JoinSet;

    use super::*;

    fn drain_kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[tokio::test]
    async fn test_admit_initial_respects_cap() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let adm = Admission::new(Some(3), TaskId::sequence(10), bus);

        let admitted = adm.admit_initial().await;
        assert_eq!(admitted, vec![TaskId(0), TaskId(1), TaskId(2)]);
        assert_eq!(adm.active_count().await, 3);
        assert_eq!(adm.pending_len().await, 7);

        let kinds = drain_kinds(&mut rx);
        assert_eq!(kinds, vec![EventKind::TaskAdmitted; 3]);
    }

    #[tokio::test]
    async fn test_admit_initial_unlimited() {
        let bus = Bus::new(64);
        let adm = Admission::new(None, TaskId::sequence(10), bus);

        let admitted = adm.admit_initial().await;
        assert_eq!(admitted.len(), 10);
        assert_eq!(adm.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_batch_completes_immediately() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let adm = Admission::new(Some(5), [], bus);

        assert!(adm.admit_initial().await.is_empty());
        assert!(adm.is_completed());
        assert_eq!(drain_kinds(&mut rx), vec![EventKind::BatchCompleted]);
    }

    #[tokio::test]
    async fn test_complete_hands_over_next_task() {
        let bus = Bus::new(64);
        let adm = Admission::new(Some(1), TaskId::sequence(3), bus);
        let token = CancellationToken::new();

        assert_eq!(adm.admit_initial().await, vec![TaskId(0)]);
        assert_eq!(adm.complete(&token).await, Some(TaskId(1)));
        assert_eq!(adm.complete(&token).await, Some(TaskId(2)));
        assert!(!adm.is_completed());
        assert_eq!(adm.complete(&token).await, None);
        assert!(adm.is_completed());
    }

    #[tokio::test]
    async fn test_complete_during_shutdown_admits_nothing() {
        let bus = Bus::new(64);
        let adm = Admission::new(Some(1), TaskId::sequence(2), bus);
        let token = CancellationToken::new();

        adm.admit_initial().await;
        token.cancel();

        assert_eq!(adm.complete(&token).await, None);
        assert_eq!(adm.active_count().await, 0);
        assert_eq!(adm.pending_len().await, 1);
        assert!(!adm.is_completed());
    }

    #[tokio::test]
    async fn test_last_success_during_shutdown_still_completes() {
        let bus = Bus::new(64);
        let adm = Admission::new(Some(1), TaskId::sequence(1), bus);
        let token = CancellationToken::new();

        adm.admit_initial().await;
        token.cancel();

        // The only task finished its work; an empty system is a completed batch.
        assert_eq!(adm.complete(&token).await, None);
        assert!(adm.is_completed());
    }

    #[tokio::test]
    async fn test_release_never_completes_batch() {
        let bus = Bus::new(64);
        let adm = Admission::new(Some(1), TaskId::sequence(1), bus);

        adm.admit_initial().await;
        adm.release().await;

        assert_eq!(adm.active_count().await, 0);
        assert!(!adm.is_completed());
    }

    #[tokio::test]
    #[should_panic(expected = "slot released with no active tasks")]
    async fn test_release_without_active_panics() {
        let bus = Bus::new(16);
        let adm = Admission::new(Some(1), [], bus);
        adm.release().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_completes_publish_one_batch_completed() {
        let bus = Bus::new(256);
        let mut rx = bus.subscribe();
        let n = 32;
        let adm = Admission::new(Some(n), TaskId::sequence(n), bus);
        let token = CancellationToken::new();

        adm.admit_initial().await;

        let mut set = JoinSet::new();
        for _ in 0..n {
            let adm = Arc::clone(&adm);
            let token = token.clone();
            set.spawn(async move { adm.complete(&token).await });
        }
        while set.join_next().await.is_some() {}

        assert!(adm.is_completed());
        let completed = drain_kinds(&mut rx)
            .into_iter()
            .filter(|k| *k == EventKind::BatchCompleted)
            .count();
        assert_eq!(completed, 1);
    }
}
