//! # Backlog: FIFO queue of tasks waiting for a slot.
//!
//! The backlog is seeded once when a batch starts and is only drained
//! afterwards. Tasks leave it in submission order, one per freed slot.
//!
//! ## Rules
//! - **FIFO**: tasks are admitted strictly in submission order.
//! - **Drain-only**: nothing is ever pushed back; a retrying task keeps its
//!   slot instead of re-entering the queue.

use std::collections::VecDeque;

use crate::work::TaskId;

/// FIFO queue of tasks that have not yet been admitted.
pub(super) struct Backlog {
    queue: VecDeque<TaskId>,
}

impl Backlog {
    /// Creates a backlog seeded with the given tasks, preserving order.
    pub fn seed(tasks: impl IntoIterator<Item = TaskId>) -> Self {
        Self {
            queue: tasks.into_iter().collect(),
        }
    }

    /// Removes and returns the oldest waiting task, or `None` if empty.
    pub fn pop_or_empty(&mut self) -> Option<TaskId> {
        self.queue.pop_front()
    }

    /// Removes and returns all waiting tasks, oldest first.
    pub fn drain(&mut self) -> Vec<TaskId> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
