//! Conditional field visibility and requiredness.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fde_model::{FieldFlags, FormValues, empty_value};

use crate::guard;

/// Predicate over the whole value set.
pub type Predicate = Arc<dyn Fn(&FormValues) -> bool + Send + Sync>;

/// Visibility and requiredness of one target field as a function of the
/// value set.
#[derive(Clone)]
pub struct ConditionalField {
    field: String,
    is_visible: Predicate,
    is_required: Option<Predicate>,
}

impl ConditionalField {
    /// Field shown whenever `is_visible` holds. Not required.
    pub fn new<F>(field: impl Into<String>, is_visible: F) -> Self
    where
        F: Fn(&FormValues) -> bool + Send + Sync + 'static,
    {
        Self {
            field: field.into(),
            is_visible: Arc::new(is_visible),
            is_required: None,
        }
    }

    /// Add a requiredness predicate. Only consulted while the field is visible.
    pub fn required_when<F>(mut self, is_required: F) -> Self
    where
        F: Fn(&FormValues) -> bool + Send + Sync + 'static,
    {
        self.is_required = Some(Arc::new(is_required));
        self
    }

    /// Target field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Evaluate both predicates.
    pub fn flags(&self, values: &FormValues) -> FieldFlags {
        let visible = (self.is_visible)(values);
        let required = visible
            && self
                .is_required
                .as_ref()
                .is_some_and(|is_required| is_required(values));
        FieldFlags::new(visible, required)
    }
}

impl fmt::Debug for ConditionalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalField")
            .field("field", &self.field)
            .field("has_required", &self.is_required.is_some())
            .finish_non_exhaustive()
    }
}

/// Flags for every field that has a spec.
///
/// Several specs for one field resolve like rules: the last one wins. A spec
/// whose predicate panics yields default flags.
pub fn compute(values: &FormValues, specs: &[ConditionalField]) -> BTreeMap<String, FieldFlags> {
    specs
        .iter()
        .map(|spec| {
            let flags = guard::call("conditional", spec.field(), || spec.flags(values))
                .unwrap_or_default();
            (spec.field.clone(), flags)
        })
        .collect()
}

/// Result of re-running the conditional specs after a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityUpdate {
    /// Fields that went from visible to hidden.
    pub hidden: Vec<String>,
    /// Fields that went from hidden to visible.
    pub shown: Vec<String>,
    /// Hidden fields holding anything other than `""`. Blank strings,
    /// `null` and empty lists count as values here.
    pub to_clear: Vec<String>,
}

impl VisibilityUpdate {
    /// Whether anything needs attention.
    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty() && self.shown.is_empty() && self.to_clear.is_empty()
    }
}

/// Keeps the last computed flags so transitions can be detected.
#[derive(Debug, Clone, Default)]
pub struct VisibilityTracker {
    specs: Vec<ConditionalField>,
    flags: BTreeMap<String, FieldFlags>,
}

impl VisibilityTracker {
    /// Track the given specs. Flags are empty until the first [`update`].
    ///
    /// [`update`]: Self::update
    pub fn new(specs: Vec<ConditionalField>) -> Self {
        Self {
            specs,
            flags: BTreeMap::new(),
        }
    }

    /// Configured specs.
    pub fn specs(&self) -> &[ConditionalField] {
        &self.specs
    }

    /// Flags of one field; defaults for fields without a spec.
    pub fn flags(&self, field: &str) -> FieldFlags {
        self.flags.get(field).copied().unwrap_or_default()
    }

    /// Flags of every field with a spec.
    pub fn all_flags(&self) -> &BTreeMap<String, FieldFlags> {
        &self.flags
    }

    /// Re-run every spec against `values`.
    ///
    /// A spec whose predicate panics keeps its previous flags.
    pub fn update(&mut self, values: &FormValues) -> VisibilityUpdate {
        let mut next = BTreeMap::new();
        for spec in &self.specs {
            let previous = self.flags.get(spec.field()).copied();
            let flags = guard::call("conditional", spec.field(), || spec.flags(values))
                .or(previous)
                .unwrap_or_default();
            next.insert(spec.field.clone(), flags);
        }

        let mut update = VisibilityUpdate::default();
        for (field, flags) in &next {
            let was_visible = self.flags.get(field).is_none_or(|f| f.visible);
            match (was_visible, flags.visible) {
                (true, false) => update.hidden.push(field.clone()),
                (false, true) => update.shown.push(field.clone()),
                _ => {}
            }
            let holds_value = values.get(field).is_some_and(|value| *value != empty_value());
            if !flags.visible && holds_value {
                update.to_clear.push(field.clone());
            }
        }

        if !update.hidden.is_empty() || !update.shown.is_empty() {
            tracing::debug!(hidden = ?update.hidden, shown = ?update.shown, "field visibility changed");
        }
        self.flags = next;
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn company_size() -> ConditionalField {
        ConditionalField::new("companySize", |values| values.is_truthy("company"))
            .required_when(|values| values.is_truthy("company"))
    }

    #[test]
    fn test_compute_defaults_required_to_false() {
        let spec = ConditionalField::new("notes", |_| true);
        let flags = compute(&FormValues::new(), &[spec]);
        assert_eq!(flags["notes"], FieldFlags::new(true, false));
    }

    #[test]
    fn test_required_forced_off_when_hidden() {
        let spec = ConditionalField::new("x", |_| false).required_when(|_| true);
        let flags = compute(&FormValues::new(), &[spec]);
        assert_eq!(flags["x"], FieldFlags::hidden());
    }

    #[test]
    fn test_tracker_reports_transitions_and_clears() {
        let mut tracker = VisibilityTracker::new(vec![company_size()]);

        let values = FormValues::from([("company", json!("Acme")), ("companySize", json!("50"))]);
        let update = tracker.update(&values);
        assert!(update.is_empty());
        assert!(tracker.flags("companySize").required);

        let values = FormValues::from([("company", json!("")), ("companySize", json!("50"))]);
        let update = tracker.update(&values);
        assert_eq!(update.hidden, vec!["companySize".to_string()]);
        assert_eq!(update.to_clear, vec!["companySize".to_string()]);
        assert!(!tracker.flags("companySize").visible);

        let values = FormValues::from([("company", json!("Beta")), ("companySize", json!(""))]);
        let update = tracker.update(&values);
        assert_eq!(update.shown, vec!["companySize".to_string()]);
        assert!(update.to_clear.is_empty());
    }

    #[test]
    fn test_initially_hidden_field_with_value_is_cleared() {
        let mut tracker = VisibilityTracker::new(vec![company_size()]);
        let values = FormValues::from([("companySize", json!("10"))]);
        let update = tracker.update(&values);
        assert_eq!(update.hidden, vec!["companySize".to_string()]);
        assert_eq!(update.to_clear, vec!["companySize".to_string()]);
    }

    #[test]
    fn test_hidden_blank_values_are_cleared() {
        let mut tracker = VisibilityTracker::new(vec![company_size()]);
        for stale in [json!("   "), json!(null), json!([]), json!({})] {
            let values = FormValues::from([("company", json!("")), ("companySize", stale)]);
            let update = tracker.update(&values);
            assert_eq!(update.to_clear, vec!["companySize".to_string()]);
        }

        let values = FormValues::from([("company", json!("")), ("companySize", json!(""))]);
        assert!(tracker.update(&values).to_clear.is_empty());
        assert!(tracker.update(&FormValues::new()).to_clear.is_empty());
    }

    #[test]
    fn test_panicking_predicate_keeps_previous_flags() {
        let spec = ConditionalField::new("x", |values| {
            if values.contains("explode") {
                panic!("bad predicate");
            }
            false
        });
        let mut tracker = VisibilityTracker::new(vec![spec]);

        tracker.update(&FormValues::new());
        assert!(!tracker.flags("x").visible);

        let update = tracker.update(&FormValues::from([("explode", json!(true))]));
        assert!(update.is_empty());
        assert!(!tracker.flags("x").visible);
    }

    #[test]
    fn test_unknown_fields_are_visible() {
        let tracker = VisibilityTracker::default();
        assert_eq!(tracker.flags("anything"), FieldFlags::default());
    }
}
