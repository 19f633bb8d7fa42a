//! Dirty state tracking for auto-save.

use chrono::{DateTime, Utc};
use fde_model::FormValues;

/// Observable auto-save state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoSaveState {
    pub is_saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
    pub has_unsaved_changes: bool,
    /// Projection written by the last successful save, or the draft loaded
    /// from storage.
    pub saved_data: Option<FormValues>,
}

/// Tracks unsaved changes of a form.
///
/// Dirtiness is structural: the current projection differs from the last
/// saved one. Typing a value and deleting it again leaves the form clean.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    saved_data: Option<FormValues>,
    dirty: bool,
    saving: bool,
    last_saved: Option<DateTime<Utc>>,
}

impl DirtyTracker {
    /// Create a new tracker with no unsaved changes and no baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are unsaved changes.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if a save is in progress.
    #[inline]
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn saved_data(&self) -> Option<&FormValues> {
        self.saved_data.as_ref()
    }

    /// Whether `projection` equals what was last saved.
    pub fn matches_saved(&self, projection: &FormValues) -> bool {
        self.saved_data.as_ref() == Some(projection)
    }

    /// Recompute dirtiness for the current projection. Returns it.
    pub fn observe(&mut self, projection: &FormValues) -> bool {
        self.dirty = !self.matches_saved(projection);
        self.dirty
    }

    /// Adopt `projection` as saved without writing it.
    pub fn set_baseline(&mut self, projection: FormValues) {
        self.saved_data = Some(projection);
        self.dirty = false;
    }

    /// Mark that a save has started. Returns `false` if one already runs.
    pub fn start_save(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.saving = true;
        true
    }

    /// Mark that a save of `saved` has completed successfully.
    ///
    /// Dirtiness is recomputed against `current`, which differs from
    /// `saved` when the user kept typing during the save.
    pub fn save_complete(&mut self, saved: FormValues, current: &FormValues, at: DateTime<Utc>) {
        self.saving = false;
        self.last_saved = Some(at);
        self.saved_data = Some(saved);
        self.observe(current);
    }

    /// Mark that a save has failed.
    pub fn save_failed(&mut self) {
        self.saving = false;
        // Keep dirty = true since save failed
    }

    pub fn state(&self) -> AutoSaveState {
        AutoSaveState {
            is_saving: self.saving,
            last_saved: self.last_saved,
            has_unsaved_changes: self.dirty,
            saved_data: self.saved_data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(name: &str) -> FormValues {
        FormValues::from([("name", json!(name))])
    }

    #[test]
    fn test_new_tracker_is_clean() {
        let tracker = DirtyTracker::new();
        assert!(!tracker.is_dirty());
        assert!(!tracker.is_saving());
        assert_eq!(tracker.saved_data(), None);
    }

    #[test]
    fn test_observe_is_structural() {
        let mut tracker = DirtyTracker::new();
        assert!(tracker.observe(&values("A")));

        tracker.set_baseline(values("A"));
        assert!(!tracker.is_dirty());
        assert!(tracker.observe(&values("Ab")));
        assert!(!tracker.observe(&values("A")));
    }

    #[test]
    fn test_save_complete() {
        let mut tracker = DirtyTracker::new();
        tracker.observe(&values("A"));
        assert!(tracker.start_save());
        assert!(!tracker.start_save());

        tracker.save_complete(values("A"), &values("A"), fde_common::now());
        let state = tracker.state();
        assert!(!state.is_saving);
        assert!(!state.has_unsaved_changes);
        assert!(state.last_saved.is_some());
        assert_eq!(state.saved_data, Some(values("A")));
    }

    #[test]
    fn test_save_complete_with_newer_values_stays_dirty() {
        let mut tracker = DirtyTracker::new();
        tracker.start_save();
        tracker.save_complete(values("A"), &values("Ab"), fde_common::now());
        assert!(tracker.is_dirty());
    }

    #[test]
    fn test_save_failed() {
        let mut tracker = DirtyTracker::new();
        tracker.observe(&values("A"));
        tracker.start_save();
        tracker.save_failed();

        assert!(tracker.is_dirty()); // Still dirty
        assert!(!tracker.is_saving());
    }
}
