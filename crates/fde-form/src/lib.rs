//! Reactive forms with conditional fields, debounced cross-field
//! validation, and draft auto-save.
//!
//! [`FormEngine`] ties the pieces of the workspace together for one form
//! instance:
//!
//! - `fde-model` holds the values and notifies on every change
//! - `fde-validate` decides visibility and runs the validation rules
//! - `fde-persistence` saves drafts while the user types
//!
//! # Example
//!
//! ```no_run
//! use fde_form::FormEngine;
//! use fde_model::FormValues;
//! use fde_validate::presets;
//! use serde_json::json;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let form = FormEngine::builder(FormValues::from([
//!     ("password", json!("")),
//!     ("confirmPassword", json!("")),
//! ]))
//! .rule(presets::confirm_password("password", "confirmPassword"))
//! .build();
//!
//! form.on_change("password", "Abc12345!");
//! form.on_change("confirmPassword", "Abc12345!");
//! form.submit(|values| async move {
//!     println!("submitting {} fields", values.len());
//!     Ok(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod settings;

pub use engine::{FormEngine, FormEngineBuilder};
pub use error::{Result, SettingsError, SubmitError};
pub use settings::FormSettings;
