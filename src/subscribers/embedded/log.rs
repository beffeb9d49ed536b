//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! ADMIT - Task[0] admitted.
//! RUN - Task[0] attempt 1 started.
//! FAIL - Task[0] failed.
//! RUN - Task[0] attempt 2 started.
//! SUCCESS - Task[0] finished successfully after 2 tries.
//! DONE - Batch completed in 412ms.
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Task id in display form, `?` when the event carries none.
fn task_of(e: &Event) -> String {
    e.task.map_or_else(|| "?".to_string(), |t| t.to_string())
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TaskAdmitted => {
                println!("ADMIT - Task[{}] admitted.", task_of(e));
            }
            EventKind::AttemptStarted => {
                println!(
                    "RUN - Task[{}] attempt {} started.",
                    task_of(e),
                    e.attempt.unwrap_or(0),
                );
            }
            EventKind::AttemptFailed => {
                println!("FAIL - Task[{}] failed.", task_of(e));
            }
            EventKind::AttemptTimedOut => {
                println!(
                    "TIMEOUT - Task[{}] hit the {}ms limit.",
                    task_of(e),
                    e.timeout_ms.unwrap_or(0),
                );
            }
            EventKind::TaskSucceeded => {
                println!(
                    "SUCCESS - Task[{}] finished successfully after {} tries.",
                    task_of(e),
                    e.attempt.unwrap_or(0),
                );
            }
            EventKind::TaskReleased => {
                println!("YIELD - Task[{}] released before completion.", task_of(e));
            }
            EventKind::BatchCompleted => {
                println!("DONE - Batch completed in {}ms.", e.elapsed_ms.unwrap_or(0));
            }
            EventKind::ShutdownRequested => {
                println!("STOP - Shutdown requested, cancelling active tasks.");
            }
            EventKind::AllStoppedWithin => {
                println!("STOP - All tasks stopped within grace.");
            }
            EventKind::GraceExceeded => {
                println!(
                    "STOP - Grace period of {}ms exceeded.",
                    e.timeout_ms.unwrap_or(0),
                );
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "WARN - Subscriber[{}] dropped an event ({}).",
                    e.subscriber.as_deref().unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "WARN - Subscriber[{}] panicked: {}.",
                    e.subscriber.as_deref().unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
