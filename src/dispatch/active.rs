//! # Slot occupancy tracker with sequence-based ordering.
//!
//! Maintains authoritative state of which tasks currently hold a slot,
//! using event sequence numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! Wrappers ──► Bus ──► subscriber_listener() ──► ActiveTracker::update()
//!                                                       │
//!                                                       ▼
//!                                            HashMap<TaskId, SlotState>
//!                                                (id → {seq, active})
//! ```
//!
//! ## Rules
//! - Only `TaskAdmitted` / `TaskSucceeded` / `TaskReleased` change slot state
//! - Read operations (`snapshot`, `is_active`) are **eventually consistent**
//! - Other events **update seq** but don't affect slot status
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::work::TaskId;

/// Per-task state for ordering validation.
#[derive(Debug, Clone)]
struct SlotState {
    /// Last seen sequence number for this task.
    last_seq: u64,
    /// Current status (true = holds a slot, false = released).
    active: bool,
}

/// Thread-safe tracker of tasks holding execution slots.
///
/// ### Responsibilities
/// - Provides snapshots for graceful shutdown (stuck task detection)
/// - Maintains authoritative state of which tasks occupy slots
/// - Rejects stale events using sequence numbers
pub struct ActiveTracker {
    state: RwLock<HashMap<TaskId, SlotState>>,
}

impl ActiveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Updates slot state if the event is newer than the last seen one.
    ///
    /// ### Ordering guarantees
    /// Events are applied only if `ev.seq > last_seq` for this task.
    /// This prevents out-of-order events from corrupting state:
    /// ```text
    /// update(TaskSucceeded, seq=100) → active=false, last_seq=100
    /// update(TaskAdmitted,  seq=99)  → rejected (stale)
    /// ```
    ///
    /// ### State transitions
    /// - `TaskAdmitted` → active=true, update seq
    /// - `TaskSucceeded` → active=false, update seq
    /// - `TaskReleased` → active=false, update seq
    /// - Other events → no state change, update seq only
    pub async fn update(&self, ev: &Event) -> bool {
        let id = match ev.task {
            Some(id) => id,
            None => return false,
        };

        let mut state = self.state.write().await;
        let entry = state.entry(id).or_insert(SlotState {
            last_seq: 0,
            active: false,
        });

        if ev.seq <= entry.last_seq {
            return false;
        }
        match ev.kind {
            EventKind::TaskAdmitted => {
                entry.last_seq = ev.seq;
                entry.active = true;
                true
            }
            EventKind::TaskSucceeded | EventKind::TaskReleased => {
                entry.last_seq = ev.seq;
                entry.active = false;
                true
            }
            _ => {
                entry.last_seq = ev.seq;
                false
            }
        }
    }

    /// Returns a sorted list of tasks currently holding slots.
    ///
    /// Used by [`Dispatcher`](crate::Dispatcher) to detect stuck tasks during
    /// graceful shutdown (wrappers that didn't stop within the grace period).
    pub async fn snapshot(&self) -> Vec<TaskId> {
        let state = self.state.read().await;
        let mut active: Vec<TaskId> = state
            .iter()
            .filter(|(_, ts)| ts.active)
            .map(|(id, _)| *id)
            .collect();
        active.sort_unstable();
        active
    }

    /// Returns true if the task currently holds a slot.
    pub async fn is_active(&self, id: TaskId) -> bool {
        self.state
            .read()
            .await
            .get(&id)
            .map(|ts| ts.active)
            .unwrap_or(false)
    }
}
