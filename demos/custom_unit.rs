//! # Example: custom_unit
//!
//! Demonstrates how to define work as a plain closure and observe the batch
//! with a custom event subscriber.
//!
//! Shows how to:
//! - Implement [`WorkUnit`] via [`WorkFn`] without a dedicated type.
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for batch lifecycle metrics.
//!
//! ## Flow
//! ```text
//! TaskId::sequence(8) ──► Dispatcher::run()
//!     ├─► RetryWrapper::run() × 2
//!     │     └─► publish(AttemptStarted / AttemptFailed / TaskSucceeded / ...)
//!     └─► subscriber_listener (in Dispatcher)
//!           ├─► ActiveTracker.update()
//!           └─► SubscriberSet.emit() ──► ConsoleSubscriber.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_unit
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use batchvisor::{
    DispatchConfig, Dispatcher, Event, EventKind, Subscribe, TaskError, TaskId, UnitRef, WorkFn,
};
use tokio_util::sync::CancellationToken;

/// A simple console subscriber that prints selected events.
/// In real life, you could export metrics, ship logs, or trigger alerts.
struct ConsoleSubscriber;

fn task_label(ev: &Event) -> String {
    ev.task
        .map_or_else(|| "<unknown>".to_string(), |t| t.to_string())
}

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            // === Lifecycle ===
            EventKind::TaskAdmitted => {
                println!("[sub] admitted:  task={}", task_label(ev));
            }
            EventKind::AttemptStarted => {
                println!(
                    "[sub] starting:  task={} attempt={}",
                    task_label(ev),
                    ev.attempt.unwrap_or(0)
                );
            }
            EventKind::AttemptFailed => {
                println!(
                    "[sub] failed:    task={} attempt={} reason={}",
                    task_label(ev),
                    ev.attempt.unwrap_or(0),
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::AttemptTimedOut => {
                let dur = ev
                    .timeout_ms
                    .map(|v| format!("{}ms", v))
                    .unwrap_or_default();
                println!(
                    "[sub] timeout:   task={} timeout={}",
                    task_label(ev),
                    dur
                );
            }
            EventKind::TaskSucceeded => {
                println!(
                    "[sub] succeeded: task={} after {} attempt(s)",
                    task_label(ev),
                    ev.attempt.unwrap_or(0)
                );
            }
            EventKind::TaskReleased => {
                println!("[sub] released:  task={}", task_label(ev));
            }

            // === Batch ===
            EventKind::BatchCompleted => {
                let elapsed = ev.elapsed_ms.map(|v| format!("{}ms", v)).unwrap_or_default();
                println!("[sub] batch completed in {elapsed}");
            }

            // === Shutdown ===
            EventKind::ShutdownRequested => {
                println!("[sub] shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                println!("[sub] all stopped within grace");
            }
            EventKind::GraceExceeded => {
                println!("[sub] grace exceeded");
            }

            // === Ignored ===
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Two tasks in flight at most, so the backlog visibly rotates
    let cfg = DispatchConfig {
        max_concurrent: 2,
        ..Default::default()
    };

    // 2. Wire in the custom subscriber
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleSubscriber)];
    let dispatcher = Dispatcher::new(cfg, subs);

    // 3. Define the work inline: every third call fails with a transient error
    let calls = Arc::new(AtomicU32::new(0));
    let unit: UnitRef = {
        let calls = Arc::clone(&calls);
        WorkFn::arc(move |task: TaskId, ctx: CancellationToken| {
            let calls = Arc::clone(&calls);
            async move {
                if ctx.is_cancelled() {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_millis(150)).await;
                let n = calls.fetch_add(1, Ordering::Relaxed);
                if n % 3 == 2 {
                    return Err(TaskError::fail(format!("transient glitch on task {task}")));
                }
                Ok(())
            }
        })
    };

    // 4. Run the batch
    let summary = dispatcher.run(unit, TaskId::sequence(8)).await?;
    println!(
        "\nfinished: {} tasks, {} attempts, {:?}",
        summary.total, summary.attempts, summary.elapsed
    );
    Ok(())
}
