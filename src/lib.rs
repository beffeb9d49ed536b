//! # batchvisor
//!
//! **Batchvisor** is a lightweight bounded-concurrency batch runner for Rust.
//!
//! It drives a finite batch of tasks through a shared work unit with at most
//! N tasks in flight, retries every task until it succeeds, and signals batch
//! completion exactly once. The crate is designed as a building block for
//! rate-limited API clients, crawlers, and bulk-processing jobs.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     TaskId batch (FIFO)
//!     ┌────┬────┬────┬────┬────┐
//!     │ 0  │ 1  │ 2  │ 3  │ …  │
//!     └──┬─┴────┴────┴────┴────┘
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher (runtime orchestrator)                                │
//! │  - Bus (broadcast events)                                         │
//! │  - Admission (single authority over slots and completion)         │
//! │  - ActiveTracker (tracks slot state with sequence numbers)        │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ RetryWrapper │   │ RetryWrapper │   │ RetryWrapper │   │
//!     │ (retry loop) │   │ (retry loop) │   │ (retry loop) │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │                  │                  │                 │
//!      │ Publishes        │ Publishes        │ Publishes       │
//!      │ Events:          │ Events:          │ Events:         │
//!      │ - AttemptStarted │ - AttemptStarted │ - AttemptFailed │
//!      │ - TaskSucceeded  │ - TaskReleased   │ - AttemptTimedOut
//!      │                  │                  │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                (capacity: DispatchConfig::bus_capacity)           │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       │    (in Dispatcher)     │
//!                       └───┬────────────────┬───┘
//!                           ▼                ▼
//!                    ActiveTracker     SubscriberSet
//!                  (sequence-based)   (per-sub queues)
//!                                  ┌─────────┼─────────┐
//!                                  ▼         ▼         ▼
//!                                  worker1  worker2  workerN
//!                                  ▼         ▼         ▼
//!                             sub1.on   sub2.on   subN.on
//!                              _event()  _event()  _event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! TaskId ──► Backlog ──► Admission ──► RetryWrapper::run()
//!
//! loop {
//!   ├─► attempt += 1
//!   ├─► publish AttemptStarted{ task, attempt }
//!   ├─► run_once(unit, task, timeout, attempt)
//!   │       │
//!   │       ├─ Ok  ──► publish TaskSucceeded{ task, attempt }
//!   │       │          └─► Admission::complete
//!   │       │                ├─ backlog non-empty ─► hand slot to next task
//!   │       │                └─ last task done    ─► fire BatchCompleted (once)
//!   │       │
//!   │       └─ Err ──► publish AttemptFailed / AttemptTimedOut
//!   │                  └─► retry immediately (no backoff, no attempt cap)
//!   │
//!   └─ exit conditions:
//!        - task succeeded (wrapper exits, successor wrapper may spawn)
//!        - runtime token cancelled (OS signal) ─► publish TaskReleased,
//!          release the slot without completing the task
//! }
//!
//! On shutdown: wrappers drain within DispatchConfig::grace, then the run
//! returns Interrupted (pending tasks listed) or GraceExceeded (stuck tasks).
//! ```
//!
//! ## Features
//! | Area              | Description                                                             | Key types / traits                     |
//! |-------------------|-------------------------------------------------------------------------|----------------------------------------|
//! | **Dispatch**      | Bounded-concurrency batch execution with retry-until-success.           | [`Dispatcher`], [`BatchSummary`]       |
//! | **Work units**    | Define the shared work as a trait object or a plain closure.            | [`WorkUnit`], [`WorkFn`], [`UnitRef`]  |
//! | **Subscriber API**| Hook into batch lifecycle events (logging, metrics, custom subscribers).| [`Subscribe`]                          |
//! | **Events**        | Sequenced, broadcast lifecycle events.                                  | [`Event`], [`EventKind`], [`Bus`]      |
//! | **Errors**        | Typed errors for the runtime and for task attempts.                     | [`TaskError`], [`RuntimeError`]        |
//! | **Configuration** | Centralize runtime settings.                                            | [`DispatchConfig`]                     |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use batchvisor::{DispatchConfig, Dispatcher, TaskId, UnitRef, WorkFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = DispatchConfig::default();
//!     cfg.max_concurrent = 3;
//!     cfg.timeout = Duration::from_secs(5);
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn batchvisor::Subscribe>> = {
//!         use batchvisor::LogWriter;
//!         vec![Arc::new(LogWriter::default())]
//!     };
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn batchvisor::Subscribe>> = Vec::new();
//!
//!     // Create dispatcher
//!     let dispatcher = Dispatcher::new(cfg, subs);
//!
//!     // A unit that succeeds on its first attempt for every task
//!     let unit: UnitRef = WorkFn::arc(|task: TaskId, ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() { return Ok(()); }
//!         println!("Hello from task {task}!");
//!         Ok(())
//!     });
//!
//!     // Run a batch of five tasks, at most three in flight
//!     let summary = dispatcher.run(unit, TaskId::sequence(5)).await?;
//!     println!("finished {} tasks in {:?}", summary.total, summary.elapsed);
//!     Ok(())
//! }
//! ```
mod dispatch;
mod error;
mod events;
mod subscribers;
mod work;

// ---- Public re-exports ----

pub use dispatch::{BatchSummary, DispatchConfig, Dispatcher};
pub use error::{RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use work::{FlakyUnit, TaskId, UnitRef, WorkFn, WorkUnit};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
