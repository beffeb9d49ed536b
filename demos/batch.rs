//! # Example: batch
//!
//! Runs a batch of flaky tasks through the dispatcher with a concurrency cap.
//!
//! Demonstrates how to:
//! - Cap in-flight tasks via [`DispatchConfig::max_concurrent`].
//! - Simulate unreliable work with [`FlakyUnit`].
//! - Watch progress with the built-in [`LogWriter`].
//!
//! ## Flow
//! ```text
//! TaskId::sequence(20) ──► Dispatcher::run()
//!     ├─► Admission::admit_initial()     (5 slots occupied)
//!     ├─► RetryWrapper::run() × 5
//!     │     ├─► publish(AttemptStarted)
//!     │     ├─► run_once()               (random delay, 80% success)
//!     │     ├─► publish(TaskSucceeded | AttemptFailed)
//!     │     └─► Admission::complete()    (hand the slot to the next task)
//!     ├─► ... slots keep rotating through the backlog ...
//!     └─► publish(BatchCompleted)        (after the 20th success)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example batch
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use batchvisor::{DispatchConfig, Dispatcher, FlakyUnit, LogWriter, Subscribe, TaskId};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Five tasks in flight at most
    let cfg = DispatchConfig {
        max_concurrent: 5,
        ..Default::default()
    };

    // 2. Print every lifecycle event
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    // 3. Create dispatcher
    let dispatcher = Dispatcher::new(cfg, subs);

    // 4. Simulated API call: 80% success rate, 100..=1000ms latency
    let unit = Arc::new(
        FlakyUnit::new(0.8)
            .with_delay_range(Duration::from_millis(100), Duration::from_millis(1000)),
    );

    println!("START - Dispatching 20 tasks, 5 at a time...");
    let start = Instant::now();

    let summary = dispatcher.run(unit, TaskId::sequence(20)).await?;

    println!(
        "END - Total time: {:?} ({} tasks, {} attempts)",
        start.elapsed(),
        summary.total,
        summary.attempts,
    );
    Ok(())
}
