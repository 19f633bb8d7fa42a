//! The form engine.
//!
//! One [`FormEngine`] owns the value store of a form instance and keeps the
//! derived engines in step with it. Every change runs through one store
//! listener, in this order:
//!
//! 1. Visibility is recomputed. Fields that became hidden lose their error,
//!    and hidden fields that still hold a value are cleared. Clearing writes
//!    back into the store, so the rest of the pipeline waits for the next
//!    notification round, which carries the cleared values.
//! 2. The debounced validator is notified.
//! 3. Auto-save recomputes dirtiness and schedules a save.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use fde_common::lock;
use fde_model::{
    FieldErrors, FieldFlags, FieldState, FormValues, StoreEvent, Subscription, ValueStore,
    empty_value,
};
use fde_persistence::{
    AutoSave, AutoSaveConfig, AutoSaveState, LoadCallback, RemoteSave, SaveOutcome, StorageMedium,
};
use fde_validate::{
    ConditionalField, DebouncedValidator, ValidationConfig, ValidationRule, ValidationSummary,
    VisibilityTracker,
};
use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{Result, SubmitError};
use crate::settings::FormSettings;

/// Configures a [`FormEngine`].
pub struct FormEngineBuilder {
    initial: FormValues,
    settings: FormSettings,
    rules: Vec<ValidationRule>,
    conditionals: Vec<ConditionalField>,
    storage: Option<Arc<dyn StorageMedium>>,
    remote: Option<RemoteSave>,
    on_load_saved: Option<LoadCallback>,
}

impl FormEngineBuilder {
    pub fn settings(mut self, settings: FormSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn validation(mut self, config: ValidationConfig) -> Self {
        self.settings.validation = config;
        self
    }

    pub fn auto_save(mut self, config: AutoSaveConfig) -> Self {
        self.settings.auto_save = config;
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = ValidationRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn conditional(mut self, field: ConditionalField) -> Self {
        self.conditionals.push(field);
        self
    }

    pub fn conditionals(mut self, fields: impl IntoIterator<Item = ConditionalField>) -> Self {
        self.conditionals.extend(fields);
        self
    }

    /// Medium that holds the draft under the auto-save storage key.
    pub fn storage(mut self, medium: Arc<dyn StorageMedium>) -> Self {
        self.storage = Some(medium);
        self
    }

    /// Remote save awaited by every auto-save attempt.
    pub fn remote_save<F, Fut>(mut self, save: F) -> Self
    where
        F: Fn(FormValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let remote: RemoteSave = Arc::new(move |values: FormValues| save(values).boxed());
        self.remote = Some(remote);
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

    pub fn restore_draft(mut self, restore: bool) -> Self {
        self.settings.restore_draft = restore;
        self
    }

    pub fn clear_draft_on_submit(mut self, clear: bool) -> Self {
        self.settings.clear_draft_on_submit = clear;
        self
    }

    /// Build the engine.
    ///
    /// Loads a stored draft (restoring it when configured), clears hidden
    /// fields of the initial values, and starts listening to changes. Must
    /// run inside a tokio runtime for debouncing and auto-save timers.
    pub fn build(self) -> FormEngine {
        let store = ValueStore::new(self.initial);
        let validator = DebouncedValidator::new(
            self.settings.validation.clone(),
            self.rules,
            self.conditionals.clone(),
        );

        let probe = validator.clone();
        let mut autosave = AutoSave::builder(self.settings.auto_save.clone())
            .validity(move |values| probe.is_valid_for(values));
        if let Some(medium) = self.storage {
            autosave = autosave.storage(medium);
        }
        if let Some(remote) = self.remote {
            autosave = autosave.remote(move |values| remote(values));
        }
        if let Some(on_load) = self.on_load_saved {
            autosave = autosave.on_load_saved(move |values| on_load(values));
        }
        let autosave = autosave.build(&store);

        if self.settings.restore_draft
            && let Some(draft) = autosave.state().saved_data
        {
            tracing::info!(fields = draft.len(), "Restoring saved draft");
            store.set_many(draft);
        }

        let mut visibility = VisibilityTracker::new(self.conditionals);
        let initial = visibility.update(&store.get());
        for field in initial.to_clear {
            store.set(field, empty_value());
        }

        let inner = Arc::new(EngineInner {
            settings: self.settings,
            store,
            visibility: Mutex::new(visibility),
            validator,
            autosave,
            deferred: Mutex::new(BTreeSet::new()),
            subscription: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });

        let weak: Weak<EngineInner> = Arc::downgrade(&inner);
        let subscription = inner.store.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_store_event(event);
            }
        });
        *lock(&inner.subscription) = Some(subscription);

        FormEngine { inner }
    }
}

/// A form instance: values, visibility, validation, and auto-save.
///
/// Cloning yields another handle to the same form. The form is disposed
/// when [`dispose`](Self::dispose) is called or the last handle is dropped.
#[derive(Clone)]
pub struct FormEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    settings: FormSettings,
    store: ValueStore,
    visibility: Mutex<VisibilityTracker>,
    validator: DebouncedValidator,
    autosave: AutoSave,
    /// Changed fields of a round that was cut short by clearing.
    deferred: Mutex<BTreeSet<String>>,
    subscription: Mutex<Option<Subscription>>,
    disposed: AtomicBool,
}

impl FormEngine {
    pub fn builder(initial: FormValues) -> FormEngineBuilder {
        FormEngineBuilder {
            initial,
            settings: FormSettings::default(),
            rules: Vec::new(),
            conditionals: Vec::new(),
            storage: None,
            remote: None,
            on_load_saved: None,
        }
    }

    pub fn settings(&self) -> &FormSettings {
        &self.inner.settings
    }

    /// The underlying value store.
    pub fn store(&self) -> &ValueStore {
        &self.inner.store
    }

    pub fn values(&self) -> FormValues {
        self.inner.store.get()
    }

    pub fn value(&self, field: &str) -> Value {
        self.inner.store.get_field(field).unwrap_or(Value::Null)
    }

    /// Values of every visible field, as handed to a submit handler.
    pub fn visible_values(&self) -> FormValues {
        let mut values = self.values();
        let visibility = lock(&self.inner.visibility);
        values.retain(|field, _| visibility.flags(field).visible);
        values
    }

    /// A renderer changed a field.
    pub fn on_change(&self, field: &str, value: impl Into<Value>) {
        if self.is_disposed() {
            return;
        }
        self.inner.store.set(field, value);
    }

    /// Write several fields with one notification.
    pub fn set_values(&self, values: FormValues) {
        if self.is_disposed() {
            return;
        }
        self.inner.store.set_many(values);
    }

    /// A renderer left a field. Validates it immediately.
    pub fn on_blur(&self, field: &str) -> bool {
        self.validate_field(field)
    }

    /// Everything a renderer needs for `field`.
    pub fn field(&self, field: &str) -> FieldState {
        FieldState::new(
            field,
            self.value(field),
            self.flags(field),
            self.inner.validator.error(field),
            self.inner.validator.is_validating(),
        )
    }

    pub fn is_field_visible(&self, field: &str) -> bool {
        self.flags(field).visible
    }

    pub fn is_field_required(&self, field: &str) -> bool {
        self.flags(field).required
    }

    pub fn field_error(&self, field: &str) -> Option<String> {
        self.inner.validator.error(field)
    }

    pub fn field_errors(&self) -> FieldErrors {
        self.inner.validator.errors()
    }

    pub fn is_validating(&self) -> bool {
        self.inner.validator.is_validating()
    }

    /// Validate every field now, including required checks.
    pub fn validate_all_fields(&self) -> bool {
        self.inner.validator.validate_all(&self.values()).is_empty()
    }

    /// Validate one field now, including its required check.
    pub fn validate_field(&self, field: &str) -> bool {
        self.inner
            .validator
            .validate_field(&self.values(), field)
            .is_none()
    }

    /// Current errors arranged for display.
    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary::from_errors(&self.field_errors())
    }

    /// Validate everything, then pass the visible values to `handler`.
    ///
    /// The handler is not called when validation fails.
    pub async fn submit<F, Fut>(&self, handler: F) -> Result<()>
    where
        F: FnOnce(FormValues) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if self.is_disposed() {
            return Err(SubmitError::Disposed);
        }
        if !self.validate_all_fields() {
            let summary = self.summary();
            tracing::debug!(errors = summary.error_count, "Submit blocked by validation");
            return Err(SubmitError::Invalid { summary });
        }

        handler(self.visible_values())
            .await
            .map_err(SubmitError::Handler)?;
        tracing::info!("Form submitted");

        if self.inner.settings.clear_draft_on_submit {
            if let Err(e) = self.inner.autosave.clear_storage() {
                tracing::warn!(error = %e, "Failed to clear draft after submit");
            }
            self.inner.autosave.reset();
        }
        Ok(())
    }

    /// Replace every value, e.g. to start over. The new values count as saved.
    pub fn reset(&self, values: FormValues) {
        if self.is_disposed() {
            return;
        }
        self.inner.store.reset(values);
        self.inner.validator.reset();
        self.inner.autosave.reset();
    }

    /// Load the stored draft into the form. Returns whether one was found.
    pub fn restore_draft(&self) -> bool {
        match self.inner.autosave.load_from_storage() {
            Some(draft) if !self.is_disposed() => {
                tracing::info!(fields = draft.len(), "Restoring saved draft");
                self.inner.store.set_many(draft);
                true
            }
            _ => false,
        }
    }

    /// The auto-save engine of this form.
    pub fn auto_save(&self) -> &AutoSave {
        &self.inner.autosave
    }

    pub async fn save_now(&self) -> SaveOutcome {
        self.inner.autosave.save_now().await
    }

    pub fn clear_storage(&self) -> fde_persistence::Result<()> {
        self.inner.autosave.clear_storage()
    }

    /// Write unsaved changes before the form goes away.
    pub fn flush_on_exit(&self) -> bool {
        self.inner.autosave.flush_on_exit()
    }

    pub fn auto_save_state(&self) -> AutoSaveState {
        self.inner.autosave.state()
    }

    pub fn is_saving(&self) -> bool {
        self.inner.autosave.is_saving()
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.inner.autosave.state().last_saved
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.autosave.has_unsaved_changes()
    }

    pub fn is_auto_save_enabled(&self) -> bool {
        self.inner.autosave.is_auto_save_enabled()
    }

    /// Receiver that observes every published error map.
    pub fn watch_errors(&self) -> watch::Receiver<FieldErrors> {
        self.inner.validator.subscribe()
    }

    /// Receiver that observes every auto-save state change.
    pub fn watch_auto_save(&self) -> watch::Receiver<AutoSaveState> {
        self.inner.autosave.watch()
    }

    /// Stop listening, cancel every timer, and ignore further input.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn flags(&self, field: &str) -> FieldFlags {
        lock(&self.inner.visibility).flags(field)
    }
}

impl fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormEngine")
            .field("store", &self.inner.store)
            .field("errors", &self.field_errors())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    fn on_store_event(&self, event: &StoreEvent) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let update = lock(&self.visibility).update(&event.values);
        for field in &update.hidden {
            self.validator.clear_error(field);
        }

        if !update.to_clear.is_empty() {
            lock(&self.deferred).extend(event.changed.iter().cloned());
            for field in update.to_clear {
                tracing::debug!(field = %field, "Clearing hidden field");
                self.store.set(field, empty_value());
            }
            return;
        }

        let mut changed = std::mem::take(&mut *lock(&self.deferred));
        changed.extend(event.changed.iter().cloned());

        self.validator.notify_changed(&event.values);
        self.autosave.on_values_changed(&event.values, &changed);
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.validator.dispose();
        self.autosave.dispose();
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
        }
        tracing::debug!("Form disposed");
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.dispose();
    }
}
