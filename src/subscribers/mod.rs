//! # Event subscribers for the dispatcher runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to deliver runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   wrapper ── publish(Event) ──► Bus ──► dispatcher listener
//!                                              │
//!                                              ├──► SubscriberSet::emit(&Event)
//!                                              │         │
//!                                              │    ┌────┴────┬─────────┬───────┐
//!                                              │    ▼         ▼         ▼       ▼
//!                                              │  LogWriter  Metrics  Custom  ...
//!                                              │
//!                                              └──► ActiveTracker (internal state tracking)
//! ```
//!
//! Each subscriber owns a bounded queue and a worker task: a slow subscriber
//! never blocks the dispatcher or its siblings, it only risks dropping its own
//! events on overflow.
//!
//! ## Implementing custom subscribers
//! ```rust
//! use batchvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct MetricsSubscriber;
//!
//! #[async_trait]
//! impl Subscribe for MetricsSubscriber {
//!     async fn on_event(&self, event: &Event) {
//!         match event.kind {
//!             EventKind::AttemptFailed => {
//!                 // increment failure counter
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod embedded;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
