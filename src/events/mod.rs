//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the dispatcher, admission
//! gate, retry wrappers and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Admission`, `RetryWrapper`, `Dispatcher`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Dispatcher::subscriber_listener()` (fans out to `SubscriberSet`
//!   and updates `ActiveTracker`).
//!
//! See `dispatch/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
