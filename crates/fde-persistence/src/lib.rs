//! Draft persistence for form instances.
//!
//! This crate saves the values of a form while the user edits it, so a
//! reload or crash does not lose work.
//!
//! # Features
//!
//! - **Filtered projection**: excluded fields (passwords) are never written
//! - **Debounced and periodic saves** driven by tokio timers
//! - **Structural change detection**: saves are skipped when nothing changed
//! - **Atomic writes** for file storage (temp file + rename)
//!
//! # Snapshot Format
//!
//! Each draft is stored as one JSON envelope under its storage key:
//!
//! ```text
//! {"data": {...values...}, "timestamp": 1700000000000, "version": "1.0"}
//! ```
//!
//! Envelopes with another version read as "no draft".
//!
//! # Architecture
//!
//! - `storage/` - Storage media (in-memory with quota, one file per key)
//! - `snapshot.rs` - Envelope type and the adapter that owns the medium
//! - `autosave/` - Auto-save infrastructure (config, DirtyTracker, engine)
//! - `error.rs` - Error types with user-friendly messages

mod autosave;
mod error;
mod snapshot;
mod storage;

pub use autosave::{
    AutoSave, AutoSaveBuilder, AutoSaveConfig, AutoSaveState, DirtyTracker, LoadCallback,
    RemoteSave, SaveFailure, SaveOutcome, SkipReason, ValidityProbe,
};
pub use error::{PersistenceError, Result};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot, SnapshotStore};
pub use storage::{FileStorage, MemoryStorage, StorageMedium, default_location};
