//! Data model for one form instance.
//!
//! # Module Organization
//!
//! - [`values`]: the value set ([`FormValues`]) and value predicates
//! - [`store`]: the observable [`ValueStore`] every engine reads from
//! - [`field`]: derived per-field state handed to renderers
//!
//! # Example
//!
//! ```
//! use fde_model::{FormValues, ValueStore};
//! use serde_json::json;
//!
//! let store = ValueStore::new(FormValues::new());
//! let _subscription = store.subscribe(|event| {
//!     assert!(event.changed.contains("email"));
//! });
//! store.set("email", json!("ada@example.com"));
//! assert_eq!(store.get().str("email"), Some("ada@example.com"));
//! ```

pub mod field;
pub mod store;
pub mod values;

pub use field::{FieldErrors, FieldFlags, FieldState};
pub use store::{Listener, StoreEvent, Subscription, ValueStore, WeakValueStore};
pub use values::{FormValues, empty_value, is_empty_value, is_truthy};
