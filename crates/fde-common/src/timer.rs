//! Cancellable timers.
//!
//! A [`Timer`] owns at most one pending task on the tokio runtime that was
//! current when the timer was created. Scheduling again replaces the pending
//! task, which is how debouncing is expressed: every new event cancels the
//! previous wait and starts a fresh one.
//!
//! Fire callbacks are plain synchronous closures. Long-running work (an async
//! save, for example) should be spawned from the callback so that cancelling
//! the timer only ever cancels the wait, never work already under way.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// One-shot or repeating timer owned by an engine.
///
/// Dropping the timer cancels whatever is pending.
#[derive(Debug)]
pub struct Timer {
    /// Name used in log output.
    name: &'static str,

    /// Runtime the timer tasks are spawned on.
    runtime: Option<Handle>,

    /// The currently scheduled task, if any.
    pending: Option<AbortHandle>,
}

impl Timer {
    /// Create an idle timer bound to the current tokio runtime.
    ///
    /// Outside a runtime the timer is inert: scheduling logs a warning and
    /// returns `false`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            runtime: Handle::try_current().ok(),
            pending: None,
        }
    }

    /// Timer name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a fire is still pending.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run `fire` once after `delay`, replacing anything already scheduled.
    pub fn schedule<F>(&mut self, delay: Duration, fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let Some(runtime) = self.runtime.as_ref() else {
            tracing::warn!(timer = self.name, "no async runtime; timer not scheduled");
            return false;
        };

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        self.pending = Some(task.abort_handle());
        tracing::trace!(timer = self.name, delay_ms = delay.as_millis() as u64, "timer scheduled");
        true
    }

    /// Run `fire` every `period`, first after one full period.
    ///
    /// A zero period disables the timer.
    pub fn repeat<F>(&mut self, period: Duration, mut fire: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        self.cancel();
        if period.is_zero() {
            return false;
        }
        let Some(runtime) = self.runtime.as_ref() else {
            tracing::warn!(timer = self.name, "no async runtime; timer not scheduled");
            return false;
        };

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                fire();
            }
        });
        self.pending = Some(task.abort_handle());
        true
    }

    /// Cancel the pending fire. Returns `true` if something was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let reader = Arc::clone(&count);
        (count, move || reader.load(Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_after_delay() {
        let (count, fired) = counter();
        let mut timer = Timer::new("test");

        assert!(timer.schedule(Duration::from_millis(100), move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired(), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending() {
        let (count, fired) = counter();
        let mut timer = Timer::new("test");

        for _ in 0..5 {
            let count = Arc::clone(&count);
            timer.schedule(Duration::from_millis(100), move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(40)).await;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_prevent_fire() {
        let (count, fired) = counter();

        let mut timer = Timer::new("cancelled");
        let first = Arc::clone(&count);
        timer.schedule(Duration::from_millis(100), move || {
            first.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.cancel());

        let mut dropped = Timer::new("dropped");
        let second = Arc::clone(&count);
        dropped.schedule(Duration::from_millis(100), move || {
            second.fetch_add(1, Ordering::SeqCst);
        });
        drop(dropped);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired(), 0);
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_fires_every_period() {
        let (count, fired) = counter();
        let mut timer = Timer::new("interval");
        timer.repeat(Duration::from_millis(100), move || {
            count.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(fired(), 3);

        timer.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired(), 3);
    }

    #[test]
    fn test_timer_without_runtime_is_inert() {
        let mut timer = Timer::new("inert");
        assert!(!timer.schedule(Duration::from_millis(1), || {}));
        assert!(!timer.is_pending());
    }
}
