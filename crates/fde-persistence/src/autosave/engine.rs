//! Debounced and periodic auto-save.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use fde_common::{Timer, lock};
use fde_model::{FormValues, Subscription, ValueStore, WeakValueStore};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use super::config::AutoSaveConfig;
use super::tracker::{AutoSaveState, DirtyTracker};
use crate::error::{PersistenceError, Result};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::storage::StorageMedium;

/// Caller-supplied remote save. Any `Err` counts as a failed save.
pub type RemoteSave =
    Arc<dyn Fn(FormValues) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Decides whether the form may be saved when `only_when_valid` is set.
pub type ValidityProbe = Arc<dyn Fn(&FormValues) -> bool + Send + Sync>;

/// Receives the draft found in storage when the engine is built.
pub type LoadCallback = Arc<dyn Fn(&FormValues) + Send + Sync>;

/// Why a save attempt did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disposed,
    InFlight,
    Invalid,
    Unchanged,
    /// Neither a storage key nor a remote callback is configured.
    NoTarget,
}

/// One failed part of a save attempt.
#[derive(Debug)]
pub enum SaveFailure {
    Storage(PersistenceError),
    Remote(anyhow::Error),
}

impl fmt::Display for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Remote(e) => write!(f, "remote save: {e:#}"),
        }
    }
}

/// Result of a save attempt. Failures are reported here, never as `Err`.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
    Failed(Vec<SaveFailure>),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Configures an [`AutoSave`].
pub struct AutoSaveBuilder {
    config: AutoSaveConfig,
    medium: Option<Arc<dyn StorageMedium>>,
    remote: Option<RemoteSave>,
    validity: Option<ValidityProbe>,
    on_load_saved: Option<LoadCallback>,
}

impl AutoSaveBuilder {
    /// Medium holding the draft under `storage_key`.
    pub fn storage(mut self, medium: Arc<dyn StorageMedium>) -> Self {
        self.medium = Some(medium);
        self
    }

    /// Remote save awaited on every save attempt.
    pub fn remote<F, Fut>(mut self, save: F) -> Self
    where
        F: Fn(FormValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let remote: RemoteSave = Arc::new(move |values: FormValues| save(values).boxed());
        self.remote = Some(remote);
        self
    }

    /// Validity check consulted when `only_when_valid` is set.
    pub fn validity<F>(mut self, probe: F) -> Self
    where
        F: Fn(&FormValues) -> bool + Send + Sync + 'static,
    {
        self.validity = Some(Arc::new(probe));
        self
    }

    /// Called once during [`build`](Self::build) with a stored draft.
    pub fn on_load_saved<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FormValues) + Send + Sync + 'static,
    {
        self.on_load_saved = Some(Arc::new(callback));
        self
    }

    /// Build the engine for the values in `store` and start its timer.
    ///
    /// The engine does not listen to the store by itself; call
    /// [`AutoSave::attach`] or feed it through
    /// [`AutoSave::on_values_changed`].
    pub fn build(self, store: &ValueStore) -> AutoSave {
        let snapshots = match (&self.config.storage_key, self.medium) {
            (Some(_), Some(medium)) => Some(SnapshotStore::new(medium)),
            (Some(key), None) => {
                tracing::warn!(
                    key = %key,
                    "No storage medium configured; drafts only go to the remote callback"
                );
                None
            }
            (None, _) => None,
        };

        let (state, _) = watch::channel(AutoSaveState::default());
        let inner = Arc::new(AutoSaveInner {
            exclude: Mutex::new(self.config.exclude_fields.clone()),
            config: self.config,
            snapshots,
            remote: self.remote,
            validity: self.validity,
            store: store.downgrade(),
            tracker: Mutex::new(DirtyTracker::new()),
            debounce: Mutex::new(Timer::new("autosave-debounce")),
            periodic: Mutex::new(Timer::new("autosave-interval")),
            disposed: AtomicBool::new(false),
            state,
        });

        inner.load_on_mount(self.on_load_saved.as_ref());
        inner.start_periodic();
        AutoSave { inner }
    }
}

/// Saves a form's draft after a quiet period and on a fixed interval.
///
/// Cloning yields another handle to the same engine. Dropping the last
/// handle stops both timers; a save already running completes.
#[derive(Clone)]
pub struct AutoSave {
    inner: Arc<AutoSaveInner>,
}

struct AutoSaveInner {
    config: AutoSaveConfig,
    exclude: Mutex<BTreeSet<String>>,
    snapshots: Option<SnapshotStore>,
    remote: Option<RemoteSave>,
    validity: Option<ValidityProbe>,
    store: WeakValueStore,
    tracker: Mutex<DirtyTracker>,
    debounce: Mutex<Timer>,
    periodic: Mutex<Timer>,
    disposed: AtomicBool,
    state: watch::Sender<AutoSaveState>,
}

impl AutoSave {
    pub fn builder(config: AutoSaveConfig) -> AutoSaveBuilder {
        AutoSaveBuilder {
            config,
            medium: None,
            remote: None,
            validity: None,
            on_load_saved: None,
        }
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.inner.config
    }

    /// Feed every change of the store to this engine.
    ///
    /// The listener holds no strong reference to the engine.
    pub fn attach(&self, store: &ValueStore) -> Subscription {
        let weak: Weak<AutoSaveInner> = Arc::downgrade(&self.inner);
        store.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.values_changed(&event.values, &event.changed);
            }
        })
    }

    /// Recompute dirtiness and schedule a debounced save if needed.
    pub fn on_values_changed(&self, values: &FormValues, changed: &BTreeSet<String>) {
        self.inner.values_changed(values, changed);
    }

    /// Cancel the pending debounce and run one save attempt now.
    pub async fn save_now(&self) -> SaveOutcome {
        lock(&self.inner.debounce).cancel();
        self.inner.attempt().await
    }

    /// Remove the persisted draft.
    pub fn clear_storage(&self) -> Result<()> {
        let (Some(snapshots), Some(key)) = (&self.inner.snapshots, &self.inner.config.storage_key)
        else {
            return Ok(());
        };
        snapshots.remove(key)?;
        tracing::info!(key = %key, "Cleared saved draft");
        Ok(())
    }

    /// Data of the persisted draft, if a compatible one exists.
    pub fn load_from_storage(&self) -> Option<FormValues> {
        self.inner.load_snapshot().map(|snapshot| snapshot.data)
    }

    /// Write unsaved changes synchronously and fire the remote save
    /// without waiting for it. Returns whether anything was flushed.
    pub fn flush_on_exit(&self) -> bool {
        self.inner.flush()
    }

    /// Replace the excluded fields and recompute dirtiness immediately.
    pub fn set_exclude_fields(&self, fields: BTreeSet<String>) {
        *lock(&self.inner.exclude) = fields;
        if let Some(store) = self.inner.store.upgrade() {
            let projection = self.inner.project(&store.get());
            lock(&self.inner.tracker).observe(&projection);
            self.inner.publish();
        }
    }

    pub fn exclude_fields(&self) -> BTreeSet<String> {
        lock(&self.inner.exclude).clone()
    }

    /// Cancel the pending save and treat the current values as saved.
    pub fn reset(&self) {
        lock(&self.inner.debounce).cancel();
        if let Some(store) = self.inner.store.upgrade() {
            let projection = self.inner.project(&store.get());
            lock(&self.inner.tracker).set_baseline(projection);
            self.inner.publish();
        }
    }

    pub fn state(&self) -> AutoSaveState {
        lock(&self.inner.tracker).state()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<AutoSaveState> {
        self.inner.state.subscribe()
    }

    pub fn is_saving(&self) -> bool {
        lock(&self.inner.tracker).is_saving()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        lock(&self.inner.tracker).is_dirty()
    }

    /// Whether automatic saves can reach a storage key or remote callback.
    pub fn is_auto_save_enabled(&self) -> bool {
        self.inner.config.enabled && self.inner.has_target()
    }

    /// Whether a debounced save is pending.
    pub fn is_save_pending(&self) -> bool {
        lock(&self.inner.debounce).is_pending()
    }

    /// Stop both timers. Later changes and timer fires are ignored.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        lock(&self.inner.debounce).cancel();
        lock(&self.inner.periodic).cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl fmt::Debug for AutoSave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSave")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AutoSaveInner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn has_target(&self) -> bool {
        self.snapshots.is_some() || self.remote.is_some()
    }

    /// Gate for `only_when_valid`. Always open without a validity probe.
    fn may_save(&self, values: &FormValues) -> bool {
        !self.config.only_when_valid || self.validity.as_ref().is_none_or(|valid| valid(values))
    }

    fn project(&self, values: &FormValues) -> FormValues {
        values.without(&lock(&self.exclude))
    }

    fn publish(&self) {
        let next = lock(&self.tracker).state();
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn load_snapshot(&self) -> Option<Snapshot> {
        let snapshots = self.snapshots.as_ref()?;
        let key = self.config.storage_key.as_deref()?;
        snapshots.read(key)
    }

    fn load_on_mount(&self, on_load: Option<&LoadCallback>) {
        let Some(snapshot) = self.load_snapshot() else {
            return;
        };
        tracing::info!(fields = snapshot.data.len(), "Loaded saved draft");
        lock(&self.tracker).set_baseline(snapshot.data.clone());
        self.publish();
        if let Some(on_load) = on_load {
            on_load(&snapshot.data);
        }
    }

    fn start_periodic(self: &Arc<Self>) {
        if !self.config.enabled {
            return;
        }
        let Some(period) = self.config.interval() else {
            return;
        };
        let weak = Arc::downgrade(self);
        lock(&self.periodic).repeat(period, move || {
            if let Some(inner) = weak.upgrade() {
                inner.spawn_attempt();
            }
        });
    }

    fn values_changed(self: &Arc<Self>, values: &FormValues, changed: &BTreeSet<String>) {
        if self.is_disposed() {
            return;
        }
        let projection = self.project(values);
        let dirty = lock(&self.tracker).observe(&projection);
        self.publish();
        if dirty && self.config.enabled && self.config.is_trigger(changed) {
            self.schedule_debounced();
        }
    }

    fn schedule_debounced(self: &Arc<Self>) {
        if self.is_disposed() || !self.config.enabled {
            return;
        }
        let weak = Arc::downgrade(self);
        lock(&self.debounce).schedule(self.config.debounce(), move || {
            if let Some(inner) = weak.upgrade() {
                inner.spawn_attempt();
            }
        });
    }

    fn spawn_attempt(self: Arc<Self>) {
        tokio::spawn(async move {
            self.attempt().await;
        });
    }

    async fn attempt(self: &Arc<Self>) -> SaveOutcome {
        if self.is_disposed() {
            return SaveOutcome::Skipped(SkipReason::Disposed);
        }
        let Some(store) = self.store.upgrade() else {
            return SaveOutcome::Skipped(SkipReason::Disposed);
        };
        if !self.has_target() {
            return SaveOutcome::Skipped(SkipReason::NoTarget);
        }

        let values = store.get();
        if !self.may_save(&values) {
            tracing::debug!("Form is invalid; skipping auto-save");
            return SaveOutcome::Skipped(SkipReason::Invalid);
        }

        let projection = self.project(&values);
        {
            let mut tracker = lock(&self.tracker);
            if tracker.is_saving() {
                return SaveOutcome::Skipped(SkipReason::InFlight);
            }
            if tracker.matches_saved(&projection) {
                tracker.observe(&projection);
                drop(tracker);
                self.publish();
                tracing::trace!("Draft unchanged since last save");
                return SaveOutcome::Skipped(SkipReason::Unchanged);
            }
            tracker.start_save();
        }
        self.publish();
        let guard = SaveGuard::new(self);

        let mut failures = Vec::new();
        if let Some(snapshots) = &self.snapshots
            && let Some(key) = &self.config.storage_key
            && let Err(e) = snapshots.write(key, &Snapshot::new(projection.clone()))
        {
            tracing::warn!(key = %key, error = %e, "Failed to persist draft");
            failures.push(SaveFailure::Storage(e));
        }
        if let Some(remote) = &self.remote
            && let Err(e) = remote(projection.clone()).await
        {
            tracing::warn!(error = %e, "Remote save failed");
            failures.push(SaveFailure::Remote(e));
        }

        if !failures.is_empty() {
            guard.fail();
            return SaveOutcome::Failed(failures);
        }

        let current = self.project(&store.get());
        let still_dirty = guard.complete(projection.clone(), &current);
        tracing::info!(fields = projection.len(), "Draft saved");

        if still_dirty {
            self.schedule_debounced();
        }
        SaveOutcome::Saved
    }

    fn flush(&self) -> bool {
        let Some(store) = self.store.upgrade() else {
            return false;
        };
        if !lock(&self.tracker).is_dirty() {
            return false;
        }
        let values = store.get();
        if !self.may_save(&values) {
            tracing::debug!("Form is invalid; skipping flush on exit");
            return false;
        }
        let projection = self.project(&values);
        let mut flushed = false;

        if let Some(snapshots) = &self.snapshots
            && let Some(key) = &self.config.storage_key
        {
            match snapshots.write(key, &Snapshot::new(projection.clone())) {
                Ok(()) => {
                    flushed = true;
                    tracing::info!(key = %key, "Flushed draft on exit");
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Failed to flush draft"),
            }
        }

        if let Some(remote) = &self.remote {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let save = remote(projection);
                    runtime.spawn(async move {
                        if let Err(e) = save.await {
                            tracing::warn!(error = %e, "Remote save on exit failed");
                        }
                    });
                    flushed = true;
                }
                Err(_) => tracing::warn!("No async runtime; skipping remote save on exit"),
            }
        }
        flushed
    }
}

/// A started save. Dropping it unfinished, as happens when the caller
/// abandons `save_now`, marks the save as failed so later attempts run.
struct SaveGuard<'a> {
    inner: &'a AutoSaveInner,
    finished: bool,
}

impl<'a> SaveGuard<'a> {
    fn new(inner: &'a AutoSaveInner) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    fn fail(mut self) {
        self.finished = true;
        lock(&self.inner.tracker).save_failed();
        self.inner.publish();
    }

    /// Record `saved` and return whether `current` is still unsaved.
    fn complete(mut self, saved: FormValues, current: &FormValues) -> bool {
        self.finished = true;
        let still_dirty = {
            let mut tracker = lock(&self.inner.tracker);
            tracker.save_complete(saved, current, fde_common::now());
            tracker.is_dirty()
        };
        self.inner.publish();
        still_dirty
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::debug!("Save attempt dropped before completing");
        lock(&self.inner.tracker).save_failed();
        self.inner.publish();
    }
}
