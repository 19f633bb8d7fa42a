//! The value set of a form instance.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mapping from field name to an arbitrary JSON-like value.
///
/// Backed by a `BTreeMap`, so equality is structural and independent of
/// insertion order, and serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, Value>);

impl FormValues {
    /// Create an empty value set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Value of a field, or `Value::Null` when absent.
    pub fn value(&self, field: &str) -> Value {
        self.0.get(field).cloned().unwrap_or(Value::Null)
    }

    /// String value of a field.
    pub fn str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Insert or replace a field value. Returns the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Whether the field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, value)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether the field is missing or holds an empty value.
    pub fn is_field_empty(&self, field: &str) -> bool {
        self.0.get(field).is_none_or(is_empty_value)
    }

    /// Whether the field holds a truthy value.
    pub fn is_truthy(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(is_truthy)
    }

    /// The value set with the given fields removed.
    ///
    /// This is the filtered projection auto-save compares and persists.
    pub fn without(&self, excluded: &BTreeSet<String>) -> FormValues {
        if excluded.is_empty() {
            return self.clone();
        }
        self.0
            .iter()
            .filter(|(field, _)| !excluded.contains(*field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    /// Keep only the fields for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.0.retain(|field, value| keep(field, value));
    }

    /// Names of fields whose values differ between `self` and `other`,
    /// including fields present on only one side.
    pub fn changed_fields(&self, other: &FormValues) -> BTreeSet<String> {
        let mut changed: BTreeSet<String> = self
            .0
            .iter()
            .filter(|(field, value)| other.0.get(*field) != Some(*value))
            .map(|(field, _)| field.clone())
            .collect();
        changed.extend(
            other
                .0
                .keys()
                .filter(|field| !self.0.contains_key(*field))
                .cloned(),
        );
        changed
    }

    /// Convert into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    /// Build from a JSON object; any other JSON value yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        }
    }

    /// Convert into a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for FormValues {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<BTreeMap<String, Value>> for FormValues {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl IntoIterator for FormValues {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormValues {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The value a hidden field is cleared to.
pub fn empty_value() -> Value {
    Value::String(String::new())
}

/// Whether a value counts as "not filled in".
///
/// Null, blank strings, and empty lists or objects are empty. Numbers and
/// booleans (including `0` and `false`) are considered filled in.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Truthiness with the usual form semantics: null, `false`, `0`, and the
/// empty string are falsy; everything else (including empty lists) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut a = FormValues::new();
        a.insert("first", "Ada");
        a.insert("last", "Lovelace");

        let mut b = FormValues::new();
        b.insert("last", "Lovelace");
        b.insert("first", "Ada");

        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_without_removes_excluded_fields() {
        let values = FormValues::from([
            ("email", json!("a@b.io")),
            ("password", json!("hunter2")),
        ]);
        let excluded = BTreeSet::from(["password".to_string()]);

        let projection = values.without(&excluded);
        assert!(projection.contains("email"));
        assert!(!projection.contains("password"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("  ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("Acme")));
        assert!(is_truthy(&json!(3)));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn test_changed_fields() {
        let before = FormValues::from([("a", json!(1)), ("b", json!(2))]);
        let after = FormValues::from([("a", json!(1)), ("b", json!(3)), ("c", json!(4))]);

        let changed = before.changed_fields(&after);
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec!["b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(FormValues::from_json(json!([1, 2])).is_none());
        let values = FormValues::from_json(json!({"name": "Ada"})).unwrap();
        assert_eq!(values.str("name"), Some("Ada"));
        assert_eq!(values.to_json(), json!({"name": "Ada"}));
    }
}
