//! Derived per-field state.
//!
//! Nothing here is mutated directly by callers; the engines recompute it from
//! the value set and the configured rule and conditional lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current error message per field. Fields without an error are absent.
pub type FieldErrors = BTreeMap<String, String>;

/// Visibility and requiredness of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldFlags {
    /// Whether the field is shown.
    pub visible: bool,
    /// Whether the field must be filled in. Never true while hidden.
    pub required: bool,
}

impl Default for FieldFlags {
    /// Fields without a conditional spec are visible and optional.
    fn default() -> Self {
        Self {
            visible: true,
            required: false,
        }
    }
}

impl FieldFlags {
    /// Build flags, forcing `required` off for hidden fields.
    pub fn new(visible: bool, required: bool) -> Self {
        Self {
            visible,
            required: visible && required,
        }
    }

    /// Flags of a hidden field.
    pub fn hidden() -> Self {
        Self::new(false, false)
    }
}

/// Everything a field renderer needs for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldState {
    /// Field name.
    pub name: String,
    /// Current value (`Null` when the field was never set).
    pub value: Value,
    /// Current error, if any.
    pub error: Option<String>,
    /// No error and no validation pending.
    pub is_valid: bool,
    /// A debounced validation pass is pending.
    pub is_validating: bool,
    /// Whether the field is shown.
    pub visible: bool,
    /// Whether the field must be filled in.
    pub required: bool,
}

impl FieldState {
    /// Assemble the state of one field.
    pub fn new(
        name: impl Into<String>,
        value: Value,
        flags: FieldFlags,
        error: Option<String>,
        is_validating: bool,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            is_valid: error.is_none() && !is_validating,
            error,
            is_validating,
            visible: flags.visible,
            required: flags.required,
        }
    }
}
