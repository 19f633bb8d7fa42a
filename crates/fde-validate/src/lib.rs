//! Validation for live form input.
//!
//! This crate evaluates two kinds of configuration against a [`FormValues`]
//! set:
//!
//! - **Conditional fields** ([`ConditionalField`]) decide per field whether it
//!   is visible and whether it is required. Evaluated synchronously on every
//!   change by [`VisibilityTracker`].
//! - **Validation rules** ([`ValidationRule`]) produce per-field error
//!   messages and may read any field (cross-field rules). Evaluated by
//!   [`evaluate`], usually through the [`DebouncedValidator`] so bursts of
//!   keystrokes cost one pass.
//!
//! Rules and predicates are user code. A predicate that panics is treated as
//! a configuration error: it is logged and ignored for that pass, and other
//! fields are unaffected.
//!
//! Ready-made rules, conditional specs, and single-field checks live in
//! [`presets`] and [`checks`].
//!
//! [`FormValues`]: fde_model::FormValues

pub mod checks;
mod conditional;
mod guard;
pub mod presets;
mod rule;
mod scheduler;
mod summary;

pub use conditional::{ConditionalField, Predicate, VisibilityTracker, VisibilityUpdate, compute};
pub use rule::{
    RuleFn, RuleResults, ValidationRule, Verdict, errors_for_field, evaluate, required_errors,
    visible_errors,
};
pub use scheduler::{DebouncedValidator, ValidationConfig};
pub use summary::{SummaryEntry, ValidationSummary};
