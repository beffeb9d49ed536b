//! # Work abstractions.
//!
//! This module provides the task-facing types:
//! - [`WorkUnit`] - trait for implementing async cancelable attempts
//! - [`WorkFn`] - closure-based work unit implementation
//! - [`UnitRef`] - shared reference to a unit (`Arc<dyn WorkUnit>`)
//! - [`FlakyUnit`] - simulated unit with latency and a random outcome
//! - [`TaskId`] - identity of one task in a batch

mod flaky;
mod unit;
mod work_fn;

pub use flaky::FlakyUnit;
pub use unit::{TaskId, UnitRef, WorkUnit};
pub use work_fn::WorkFn;
