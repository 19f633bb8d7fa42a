//! Cross-field validation rules.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fde_model::{FieldErrors, FieldFlags, FormValues};
use serde_json::Value;

use crate::guard;

/// Outcome of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The value is acceptable.
    Pass,
    /// The value is rejected; the rule's own message is shown.
    Fail,
    /// The value is rejected with this exact message.
    Message(String),
}

impl Verdict {
    /// Error message for this verdict, falling back to `message` on `Fail`.
    pub fn into_error(self, message: &str) -> Option<String> {
        match self {
            Self::Pass => None,
            Self::Fail => Some(message.to_string()),
            Self::Message(text) => Some(text),
        }
    }

    /// Whether the verdict accepts the value.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }
}

impl From<&str> for Verdict {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for Verdict {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<Option<String>> for Verdict {
    fn from(error: Option<String>) -> Self {
        error.map_or(Self::Pass, Self::Message)
    }
}

/// Rule predicate: `(field value, all values) -> verdict`.
pub type RuleFn = Arc<dyn Fn(&Value, &FormValues) -> Verdict + Send + Sync>;

/// Validation rule for one field that may read any other field.
#[derive(Clone)]
pub struct ValidationRule {
    field: String,
    message: String,
    validate: RuleFn,
}

impl ValidationRule {
    /// Create a rule for `field`.
    ///
    /// The predicate may return anything convertible into a [`Verdict`]:
    /// `bool` (with `false` showing `message`), or a string used verbatim.
    pub fn new<F, V>(field: impl Into<String>, message: impl Into<String>, validate: F) -> Self
    where
        F: Fn(&Value, &FormValues) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self {
            field: field.into(),
            message: message.into(),
            validate: Arc::new(move |value, values| validate(value, values).into()),
        }
    }

    /// Create a rule that only looks at the field's own value.
    pub fn single<F, V>(field: impl Into<String>, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self::new(field, message, move |value, _| check(value))
    }

    /// Target field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Default failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run the rule against `values`, returning the error message on failure.
    ///
    /// A missing field is passed to the predicate as `Value::Null`.
    pub fn check(&self, values: &FormValues) -> Option<String> {
        let value = values.get(&self.field).unwrap_or(&Value::Null);
        (self.validate)(value, values).into_error(&self.message)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("field", &self.field)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Per-field outcome of a rule pass. `None` means the last rule for that
/// field passed.
pub type RuleResults = BTreeMap<String, Option<String>>;

/// Evaluate every rule in list order.
///
/// When several rules target the same field, the last one in the list wins:
/// its outcome overwrites earlier ones, including a pass overwriting an
/// earlier failure. A rule that panics is logged and leaves the entry as it
/// was.
pub fn evaluate(values: &FormValues, rules: &[ValidationRule]) -> RuleResults {
    let mut results = RuleResults::new();
    for rule in rules {
        if let Some(outcome) = guard::call("rule", rule.field(), || rule.check(values)) {
            results.insert(rule.field.clone(), outcome);
        }
    }
    results
}

/// Evaluate only the rules targeting `field`, with the same last-wins order.
pub fn errors_for_field(values: &FormValues, rules: &[ValidationRule], field: &str) -> Option<String> {
    let mut error = None;
    for rule in rules.iter().filter(|rule| rule.field == field) {
        if let Some(outcome) = guard::call("rule", field, || rule.check(values)) {
            error = outcome;
        }
    }
    error
}

/// Drop passes and errors of hidden fields.
///
/// Fields without flags are treated as visible.
pub fn visible_errors(results: RuleResults, flags: &BTreeMap<String, FieldFlags>) -> FieldErrors {
    results
        .into_iter()
        .filter(|(field, _)| flags.get(field).is_none_or(|f| f.visible))
        .filter_map(|(field, error)| error.map(|error| (field, error)))
        .collect()
}

/// `message` for every visible, required field that is empty.
pub fn required_errors(
    values: &FormValues,
    flags: &BTreeMap<String, FieldFlags>,
    message: &str,
) -> FieldErrors {
    flags
        .iter()
        .filter(|(field, flags)| flags.required && values.is_field_empty(field))
        .map(|(field, _)| (field.clone(), message.to_string()))
        .collect()
}
