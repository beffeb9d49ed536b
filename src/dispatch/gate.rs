//! # Completion gate: one-shot batch-done latch.
//!
//! The gate separates *detecting* completion (the last slot release observes
//! an empty backlog and zero active tasks) from *announcing* it. Whoever wins
//! [`CompletionGate::fire`] announces; everyone else sees `false` and stays
//! quiet, so the batch-completed signal is delivered exactly once no matter
//! how many releases race.

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot latch that marks a batch as fully completed.
pub(super) struct CompletionGate {
    fired: AtomicBool,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Fires the gate. Returns `true` for exactly one caller.
    pub fn fire(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::task::JoinSet;

    use super::*;

    #[test]
    fn test_fire_wins_once() {
        let gate = CompletionGate::new();
        assert!(!gate.is_fired());
        assert!(gate.fire());
        assert!(!gate.fire());
        assert!(gate.is_fired());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fire_has_single_winner() {
        let gate = Arc::new(CompletionGate::new());
        let mut set = JoinSet::new();

        for _ in 0..32 {
            let gate = Arc::clone(&gate);
            set.spawn(async move { gate.fire() });
        }

        let mut winners = 0;
        while let Some(res) = set.join_next().await {
            if res.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
