//! Auto-save functionality for form drafts.
//!
//! Provides:
//! - `AutoSaveConfig` - User settings for auto-save behavior
//! - `DirtyTracker` - Tracks unsaved changes against the last saved projection
//! - `AutoSave` - Debounced and periodic saving through the snapshot store

mod config;
mod engine;
mod tracker;

pub use config::AutoSaveConfig;
pub use engine::{
    AutoSave, AutoSaveBuilder, LoadCallback, RemoteSave, SaveFailure, SaveOutcome, SkipReason,
    ValidityProbe,
};
pub use tracker::{AutoSaveState, DirtyTracker};
