//! Debounced validation.
//!
//! Every change notification cancels the pending pass and starts a new
//! quiet-period timer. When the timer fires, the rules run once against the
//! values from the last notification and the results are published.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use fde_common::{Timer, lock};
use fde_model::{FieldErrors, FormValues};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::conditional::{ConditionalField, compute};
use crate::rule::{ValidationRule, errors_for_field, evaluate, required_errors, visible_errors};

/// Validation behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Validate while the user types. When off, errors only change through
    /// explicit validation.
    pub real_time: bool,

    /// Quiet period before a live validation pass, in milliseconds.
    pub debounce_ms: u64,

    /// Error shown for visible, required fields left empty.
    pub required_message: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            real_time: true,
            debounce_ms: 300,
            required_message: "This field is required".to_string(),
        }
    }
}

impl ValidationConfig {
    /// Longer debounce suited to forms with expensive cross-field rules.
    pub fn cross_field() -> Self {
        Self {
            debounce_ms: 500,
            ..Default::default()
        }
    }

    /// Debounce as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Coalesces change notifications into debounced validation passes.
///
/// Cloning yields another handle to the same validator. Dropping the last
/// handle cancels the pending pass.
#[derive(Clone)]
pub struct DebouncedValidator {
    inner: Arc<ValidatorInner>,
}

struct ValidatorInner {
    config: ValidationConfig,
    rules: Vec<ValidationRule>,
    specs: Vec<ConditionalField>,
    timer: Mutex<Timer>,
    state: Mutex<ValidatorState>,
    published: watch::Sender<FieldErrors>,
}

#[derive(Default)]
struct ValidatorState {
    errors: FieldErrors,
    is_validating: bool,
    last_validated: Option<FormValues>,
    passes: u64,
    disposed: bool,
}

impl DebouncedValidator {
    /// Create a validator for the given rules.
    ///
    /// `specs` are used to suppress errors of hidden fields.
    pub fn new(
        config: ValidationConfig,
        rules: Vec<ValidationRule>,
        specs: Vec<ConditionalField>,
    ) -> Self {
        let (published, _) = watch::channel(FieldErrors::new());
        Self {
            inner: Arc::new(ValidatorInner {
                config,
                rules,
                specs,
                timer: Mutex::new(Timer::new("validation-debounce")),
                state: Mutex::new(ValidatorState::default()),
                published,
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.inner.config
    }

    /// Configured rules.
    pub fn rules(&self) -> &[ValidationRule] {
        &self.inner.rules
    }

    /// Call on every value change. Restarts the quiet period.
    pub fn notify_changed(&self, values: &FormValues) {
        if !self.inner.config.real_time {
            return;
        }
        {
            let mut state = lock(&self.inner.state);
            if state.disposed {
                return;
            }
            state.is_validating = true;
        }

        let weak: Weak<ValidatorInner> = Arc::downgrade(&self.inner);
        let values = values.clone();
        let scheduled = lock(&self.inner.timer).schedule(self.inner.config.debounce(), move || {
            if let Some(inner) = weak.upgrade() {
                inner.run_pass(values);
            }
        });
        if !scheduled {
            lock(&self.inner.state).is_validating = false;
        }
    }

    /// Whether a debounced pass is pending.
    pub fn is_validating(&self) -> bool {
        lock(&self.inner.state).is_validating
    }

    /// Errors from the most recent validation.
    pub fn errors(&self) -> FieldErrors {
        lock(&self.inner.state).errors.clone()
    }

    /// Current error of one field.
    pub fn error(&self, field: &str) -> Option<String> {
        lock(&self.inner.state).errors.get(field).cloned()
    }

    /// Number of debounced passes that actually evaluated the rules.
    pub fn pass_count(&self) -> u64 {
        lock(&self.inner.state).passes
    }

    /// Value set evaluated by the most recent debounced pass.
    pub fn last_validated(&self) -> Option<FormValues> {
        lock(&self.inner.state).last_validated.clone()
    }

    /// Receiver that observes every published error map.
    pub fn subscribe(&self) -> watch::Receiver<FieldErrors> {
        self.inner.published.subscribe()
    }

    /// Validate every field now, including required checks.
    ///
    /// Cancels any pending debounced pass and publishes the result.
    pub fn validate_all(&self, values: &FormValues) -> FieldErrors {
        lock(&self.inner.timer).cancel();
        let errors = self.inner.full_errors(values);
        {
            let mut state = lock(&self.inner.state);
            if state.disposed {
                return errors;
            }
            state.errors = errors.clone();
            state.is_validating = false;
        }
        self.inner.published.send_replace(errors.clone());
        errors
    }

    /// Validate one field now, including its required check.
    ///
    /// Only that field's error entry is updated. Returns its new error.
    pub fn validate_field(&self, values: &FormValues, field: &str) -> Option<String> {
        let flags = compute(values, &self.inner.specs)
            .get(field)
            .copied()
            .unwrap_or_default();
        let error = if !flags.visible {
            None
        } else if flags.required && values.is_field_empty(field) {
            Some(self.inner.config.required_message.clone())
        } else {
            errors_for_field(values, &self.inner.rules, field)
        };

        let published = {
            let mut state = lock(&self.inner.state);
            if state.disposed {
                return error;
            }
            match &error {
                Some(message) => state.errors.insert(field.to_string(), message.clone()),
                None => state.errors.remove(field),
            };
            state.errors.clone()
        };
        self.inner.published.send_replace(published);
        error
    }

    /// Whether `values` pass every rule and required check. Publishes nothing.
    pub fn is_valid_for(&self, values: &FormValues) -> bool {
        self.inner.full_errors(values).is_empty()
    }

    /// Drop the error of a field, e.g. because it was hidden.
    pub fn clear_error(&self, field: &str) {
        let published = {
            let mut state = lock(&self.inner.state);
            if state.errors.remove(field).is_none() {
                return;
            }
            state.errors.clone()
        };
        self.inner.published.send_replace(published);
    }

    /// Cancel the pending pass without disposing.
    pub fn cancel(&self) {
        lock(&self.inner.timer).cancel();
        lock(&self.inner.state).is_validating = false;
    }

    /// Cancel the pending pass and forget all results.
    pub fn reset(&self) {
        lock(&self.inner.timer).cancel();
        {
            let mut state = lock(&self.inner.state);
            if state.disposed {
                return;
            }
            state.errors.clear();
            state.last_validated = None;
            state.is_validating = false;
        }
        self.inner.published.send_replace(FieldErrors::new());
    }

    /// Cancel the pending pass and ignore every later notification.
    pub fn dispose(&self) {
        lock(&self.inner.timer).cancel();
        let mut state = lock(&self.inner.state);
        state.disposed = true;
        state.is_validating = false;
    }

    /// Whether [`dispose`](Self::dispose) was called.
    pub fn is_disposed(&self) -> bool {
        lock(&self.inner.state).disposed
    }
}

impl ValidatorInner {
    fn run_pass(&self, values: FormValues) {
        {
            let mut state = lock(&self.state);
            if state.disposed {
                return;
            }
            if state.last_validated.as_ref() == Some(&values) {
                state.is_validating = false;
                tracing::trace!("values unchanged since last pass; skipping validation");
                return;
            }
        }

        let flags = compute(&values, &self.specs);
        let errors = visible_errors(evaluate(&values, &self.rules), &flags);

        {
            let mut state = lock(&self.state);
            if state.disposed {
                return;
            }
            state.errors = errors.clone();
            state.last_validated = Some(values);
            state.passes += 1;
            state.is_validating = false;
            tracing::debug!(pass = state.passes, errors = errors.len(), "validation pass complete");
        }
        self.published.send_replace(errors);
    }

    fn full_errors(&self, values: &FormValues) -> FieldErrors {
        let flags = compute(values, &self.specs);
        let mut errors = visible_errors(evaluate(values, &self.rules), &flags);
        errors.extend(required_errors(
            values,
            &flags,
            &self.config.required_message,
        ));
        errors
    }
}

impl Drop for ValidatorInner {
    fn drop(&mut self) {
        lock(&self.timer).cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn not_empty(field: &str) -> ValidationRule {
        ValidationRule::single(field, format!("{field} is empty"), |value| {
            value.as_str().is_some_and(|s| !s.is_empty())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_coalesce_into_one_pass() {
        let validator = DebouncedValidator::new(ValidationConfig::default(), vec![not_empty("name")], vec![]);

        for text in ["A", "Ad", "Ada", ""] {
            validator.notify_changed(&FormValues::from([("name", json!(text))]));
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert!(validator.is_validating());
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(validator.pass_count(), 1);
        assert!(!validator.is_validating());
        assert_eq!(validator.error("name").as_deref(), Some("name is empty"));
        assert_eq!(
            validator.last_validated(),
            Some(FormValues::from([("name", json!(""))]))
        );
    }

    #[test]
    fn test_notify_without_runtime_does_not_stay_validating() {
        let validator = DebouncedValidator::new(ValidationConfig::default(), vec![not_empty("name")], vec![]);

        validator.notify_changed(&FormValues::from([("name", json!(""))]));

        assert!(!validator.is_validating());
        assert_eq!(validator.pass_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_values_skip_the_pass() {
        let validator = DebouncedValidator::new(ValidationConfig::default(), vec![not_empty("name")], vec![]);
        let values = FormValues::from([("name", json!("Ada"))]);

        validator.notify_changed(&values);
        tokio::time::sleep(Duration::from_millis(400)).await;
        validator.notify_changed(&values);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(validator.pass_count(), 1);
        assert!(!validator.is_validating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_pending_pass() {
        let validator = DebouncedValidator::new(ValidationConfig::default(), vec![not_empty("name")], vec![]);
        validator.notify_changed(&FormValues::new());
        validator.dispose();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(validator.pass_count(), 0);
        assert!(validator.errors().is_empty());

        validator.notify_changed(&FormValues::new());
        assert!(!validator.is_validating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_time_off_ignores_changes() {
        let config = ValidationConfig {
            real_time: false,
            ..Default::default()
        };
        let validator = DebouncedValidator::new(config, vec![not_empty("name")], vec![]);
        validator.notify_changed(&FormValues::new());
        assert!(!validator.is_validating());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(validator.pass_count(), 0);

        let errors = validator.validate_all(&FormValues::new());
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_field_errors_are_not_published() {
        let specs = vec![ConditionalField::new("companySize", |values| {
            values.is_truthy("company")
        })];
        let validator =
            DebouncedValidator::new(ValidationConfig::default(), vec![not_empty("companySize")], specs);

        validator.notify_changed(&FormValues::from([("company", json!(""))]));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(validator.errors().is_empty());

        validator.notify_changed(&FormValues::from([("company", json!("Acme"))]));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(validator.error("companySize").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_published_errors() {
        let validator = DebouncedValidator::new(ValidationConfig::default(), vec![not_empty("name")], vec![]);
        let mut errors = validator.subscribe();

        validator.notify_changed(&FormValues::new());
        errors.changed().await.unwrap();
        assert!(errors.borrow().contains_key("name"));
    }

    #[test]
    fn test_validate_field_applies_required_check() {
        let specs = vec![ConditionalField::new("phone", |_| true).required_when(|_| true)];
        let rules = vec![ValidationRule::single("phone", "Bad phone", |value| {
            value.as_str().is_some_and(|s| s.len() >= 10)
        })];
        let validator = DebouncedValidator::new(ValidationConfig::default(), rules, specs);

        let empty = FormValues::from([("phone", json!(""))]);
        assert_eq!(
            validator.validate_field(&empty, "phone").as_deref(),
            Some("This field is required")
        );

        let short = FormValues::from([("phone", json!("123"))]);
        assert_eq!(validator.validate_field(&short, "phone").as_deref(), Some("Bad phone"));
        assert!(!validator.is_valid_for(&short));

        let good = FormValues::from([("phone", json!("0123456789"))]);
        assert_eq!(validator.validate_field(&good, "phone"), None);
        assert!(validator.errors().is_empty());
        assert!(validator.is_valid_for(&good));
    }
}
