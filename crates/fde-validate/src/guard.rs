//! Evaluation boundary for user-supplied predicates.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run a user predicate, turning a panic into `None` plus an error log.
pub(crate) fn call<T>(kind: &'static str, field: &str, predicate: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(predicate)) {
        Ok(result) => Some(result),
        Err(payload) => {
            tracing::error!(
                kind,
                field,
                reason = panic_message(payload.as_ref()),
                "configuration error: predicate panicked, ignored for this pass"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
