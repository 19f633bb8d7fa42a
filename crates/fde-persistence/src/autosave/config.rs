//! Auto-save configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for auto-save behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Whether changes and the periodic timer trigger saves.
    ///
    /// Manual saves work either way.
    pub enabled: bool,

    /// Debounce delay in milliseconds.
    ///
    /// After a change, the engine waits this long before saving.
    /// Additional changes reset the timer.
    pub debounce_ms: u64,

    /// Period of the fixed save timer in milliseconds. `0` disables it.
    ///
    /// Bounds how long continuous typing can postpone a save.
    pub interval_ms: u64,

    /// Key of the persisted draft. Without a key only the remote callback
    /// is used.
    pub storage_key: Option<String>,

    /// Fields never persisted (passwords, card numbers).
    pub exclude_fields: BTreeSet<String>,

    /// Skip saves while the form is invalid.
    pub only_when_valid: bool,

    /// When set, only changes to these fields schedule a debounced save.
    pub trigger_fields: Option<BTreeSet<String>>,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1000,    // 1 second
            interval_ms: 30_000,  // 30 seconds
            storage_key: None,
            exclude_fields: BTreeSet::new(),
            only_when_valid: false,
            trigger_fields: None,
        }
    }
}

impl AutoSaveConfig {
    /// Create a disabled auto-save config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Default config persisting under `key`.
    pub fn with_storage_key(key: impl Into<String>) -> Self {
        Self {
            storage_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Period of the fixed timer, if enabled.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }

    /// Whether a change to `changed` should schedule a debounced save.
    pub fn is_trigger(&self, changed: &BTreeSet<String>) -> bool {
        match &self.trigger_fields {
            Some(triggers) => changed.iter().any(|field| triggers.contains(field)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = AutoSaveConfig::default();
        assert!(config.enabled);
        assert_eq!(config.debounce_ms, 1000);
        assert_eq!(config.interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.storage_key, None);
    }

    #[test]
    fn test_zero_interval_disables_timer() {
        let config = AutoSaveConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.interval(), None);
    }

    #[test]
    fn test_trigger_fields() {
        let changed = |field: &str| BTreeSet::from([field.to_string()]);
        let mut config = AutoSaveConfig::default();
        assert!(config.is_trigger(&changed("anything")));

        config.trigger_fields = Some(BTreeSet::from(["title".to_string()]));
        assert!(config.is_trigger(&changed("title")));
        assert!(!config.is_trigger(&changed("body")));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: AutoSaveConfig =
            serde_json::from_value(json!({"storage_key": "draft", "exclude_fields": ["password"]}))
                .unwrap();
        assert_eq!(config.storage_key.as_deref(), Some("draft"));
        assert!(config.exclude_fields.contains("password"));
        assert_eq!(config.debounce_ms, 1000);
    }
}
