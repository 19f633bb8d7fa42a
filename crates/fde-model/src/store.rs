//! Observable value store.
//!
//! The store is pure storage plus a change-notification bus. Every mutation
//! synchronously notifies subscribers with the full value set and the names
//! of the fields that changed.
//!
//! A mutation issued from inside a listener is applied immediately, but its
//! notification is deferred until the running round has reached every
//! listener. The store then starts a new round with the latest values, so
//! listeners always observe mutations in order and never re-enter each other.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use fde_common::lock;
use serde_json::Value;

use crate::values::FormValues;

/// Callback invoked on every store mutation.
pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Notification delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    /// Full value set after the mutation.
    pub values: FormValues,
    /// Fields written since the previous notification.
    pub changed: BTreeSet<String>,
}

/// Handle to the value set of one form instance.
///
/// Cloning the store yields another handle to the same values.
#[derive(Clone)]
pub struct ValueStore {
    inner: Arc<StoreInner>,
}

/// Non-owning handle, used by listeners that need to write back.
#[derive(Clone)]
pub struct WeakValueStore {
    inner: Weak<StoreInner>,
}

struct StoreInner {
    state: Mutex<StoreState>,
}

struct StoreState {
    values: FormValues,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    /// Fields written but not yet announced.
    pending: BTreeSet<String>,
    /// Whether a notification round is running.
    dispatching: bool,
}

impl ValueStore {
    /// Create a store holding `initial` values.
    pub fn new(initial: FormValues) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    values: initial,
                    listeners: Vec::new(),
                    next_listener_id: 0,
                    pending: BTreeSet::new(),
                    dispatching: false,
                }),
            }),
        }
    }

    /// Snapshot of the current value set.
    pub fn get(&self) -> FormValues {
        lock(&self.inner.state).values.clone()
    }

    /// Current value of one field.
    pub fn get_field(&self, field: &str) -> Option<Value> {
        lock(&self.inner.state).values.get(field).cloned()
    }

    /// Write one field and notify subscribers.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        {
            let mut state = lock(&self.inner.state);
            state.values.insert(field.clone(), value.into());
            state.pending.insert(field);
        }
        self.dispatch();
    }

    /// Write several fields with a single notification.
    pub fn set_many(&self, values: FormValues) {
        if values.is_empty() {
            return;
        }
        {
            let mut state = lock(&self.inner.state);
            for (field, value) in values {
                state.pending.insert(field.clone());
                state.values.insert(field, value);
            }
        }
        self.dispatch();
    }

    /// Replace the whole value set. Subscribers are told about every field
    /// that was added, removed, or changed.
    pub fn reset(&self, values: FormValues) {
        {
            let mut state = lock(&self.inner.state);
            let changed = state.values.changed_fields(&values);
            if changed.is_empty() {
                return;
            }
            state.pending.extend(changed);
            state.values = values;
        }
        self.dispatch();
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut state = lock(&self.inner.state);
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, Arc::new(listener)));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.inner.state).listeners.len()
    }

    /// Create a non-owning handle.
    pub fn downgrade(&self) -> WeakValueStore {
        WeakValueStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn dispatch(&self) {
        loop {
            let (event, listeners) = {
                let mut state = lock(&self.inner.state);
                if state.dispatching || state.pending.is_empty() {
                    return;
                }
                state.dispatching = true;
                let event = StoreEvent {
                    values: state.values.clone(),
                    changed: std::mem::take(&mut state.pending),
                };
                let listeners: Vec<Listener> = state
                    .listeners
                    .iter()
                    .map(|(_, listener)| Arc::clone(listener))
                    .collect();
                (event, listeners)
            };

            tracing::trace!(
                changed = event.changed.len(),
                listeners = listeners.len(),
                "dispatching store change"
            );
            let _round = DispatchRound(&self.inner);
            for listener in &listeners {
                listener(&event);
            }
        }
    }
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("ValueStore")
            .field("fields", &state.values.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new(FormValues::new())
    }
}

impl WeakValueStore {
    /// Upgrade to a full handle if the store is still alive.
    pub fn upgrade(&self) -> Option<ValueStore> {
        self.inner.upgrade().map(|inner| ValueStore { inner })
    }
}

/// Clears the dispatching flag when a round ends, including by panic.
struct DispatchRound<'a>(&'a StoreInner);

impl Drop for DispatchRound<'_> {
    fn drop(&mut self) {
        lock(&self.0.state).dispatching = false;
    }
}

/// Registration handle returned by [`ValueStore::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: Option<u64>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the listener registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.id = None;
    }

    fn remove(&mut self) {
        let (Some(id), Some(inner)) = (self.id.take(), self.store.upgrade()) else {
            return;
        };
        lock(&inner.state)
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
