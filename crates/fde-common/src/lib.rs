//! Shared utilities for the Form Draft Engine crates.
//!
//! - [`Timer`] - cancellable one-shot and repeating timers owned by an engine
//! - [`lock`] - mutex access that survives a poisoned lock
//! - [`now_millis`] - wall-clock Unix milliseconds used in snapshots

mod clock;
mod sync;
mod timer;

pub use clock::{now, now_millis};
pub use sync::lock;
pub use timer::Timer;
