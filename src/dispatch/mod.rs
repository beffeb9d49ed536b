//! Runtime core: admission, retry wrappers, and batch lifecycle.
//!
//! This module contains the embedded implementation of the batchvisor runtime.
//! The public API from this module is [`Dispatcher`] plus its configuration
//! ([`DispatchConfig`]) and result ([`BatchSummary`]).
//!
//! ```text
//!                ┌────────────────── Dispatcher::run ──────────────────┐
//!                │                                                     │
//!   TaskId ──► Backlog ──► Admission ──► RetryWrapper ──► WorkUnit     │
//!   batch        FIFO       cap N          retry loop      attempt()   │
//!                │            │               │                        │
//!                │            └── CompletionGate (fires exactly once)  │
//!                │            │                                        │
//!                │            └──► Bus ──► listener ──► SubscriberSet  │
//!                │                            │                        │
//!                │                            └──► ActiveTracker       │
//!                └─────────────────────────────────────────────────────┘
//! ```
//!
//! Internal modules:
//! - [`admission`]: single authority over slot accounting and completion;
//! - [`backlog`]: FIFO of task ids waiting for a slot;
//! - [`gate`]: one-shot completion latch;
//! - [`wrapper`]: retries one admitted task until success or shutdown;
//! - [`runner`]: executes one attempt with timeout/cancellation and event publishing;
//! - [`dispatcher`]: supervises wrappers, handles signals and graceful shutdown;
//! - [`active`]: event-driven view of which tasks hold slots;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod active;
mod admission;
mod backlog;
mod config;
mod dispatcher;
mod gate;
mod runner;
mod shutdown;
mod wrapper;

pub use config::DispatchConfig;
pub use dispatcher::{BatchSummary, Dispatcher};
