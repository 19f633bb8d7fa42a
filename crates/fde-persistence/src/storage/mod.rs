//! Durable media for draft snapshots.
//!
//! A medium is a synchronous string key-value store. Implementations use
//! interior mutability so one medium can be shared between forms.

mod file;
mod memory;

pub use file::{FileStorage, default_location};
pub use memory::MemoryStorage;

use crate::error::Result;

/// Synchronous key-value storage.
pub trait StorageMedium: Send + Sync {
    /// Stored value for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
