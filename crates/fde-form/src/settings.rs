//! Form settings persistence.
//!
//! Settings are stored as TOML in the platform-specific config folder
//! (see [`FormSettings::config_path`]).

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use fde_persistence::AutoSaveConfig;
use fde_validate::ValidationConfig;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "form-drafts";
const APP_NAME: &str = "Form Drafts";
const CONFIG_FILENAME: &str = "settings.toml";

/// Everything configurable about a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    /// Restore a stored draft into the form when it is built.
    pub restore_draft: bool,

    /// Remove the stored draft after a successful submit.
    pub clear_draft_on_submit: bool,

    pub validation: ValidationConfig,

    pub auto_save: AutoSaveConfig,
}

impl FormSettings {
    /// Get the path to the settings file.
    ///
    /// Returns `None` if the platform-specific directory cannot be determined.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Load settings from the default path.
    ///
    /// Returns default settings if:
    /// - The settings file doesn't exist
    /// - The settings file cannot be parsed
    /// - The platform-specific directory cannot be determined
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("Could not determine settings path, using defaults");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {:?}", path);
                settings
            }
            Err(SettingsError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::info!("No settings file found at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|e| SettingsError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save settings to the default path.
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save settings to a specific path.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                operation: "create directory for",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| SettingsError::Serialize { source: e })?;

        fs::write(path, content).map_err(|e| SettingsError::Io {
            operation: "write",
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings_serializable() {
        let toml = toml::to_string_pretty(&FormSettings::default());
        assert!(toml.is_ok());
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        let mut settings = FormSettings::default();
        settings.restore_draft = true;
        settings.validation.debounce_ms = 500;
        settings.auto_save.storage_key = Some("signup".to_string());
        settings.auto_save.exclude_fields = BTreeSet::from(["password".to_string()]);

        settings.save_to(&path).unwrap();
        let loaded = FormSettings::load_from(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "[auto_save]\ninterval_ms = 0\n").unwrap();

        let loaded = FormSettings::load_from(&path).unwrap();
        assert_eq!(loaded.auto_save.interval_ms, 0);
        assert_eq!(loaded.auto_save.debounce_ms, 1000);
        assert_eq!(loaded.validation, ValidationConfig::default());
    }

    #[test]
    fn test_invalid_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "validation = 3").unwrap();

        let error = FormSettings::load_from(&path).unwrap_err();
        assert!(matches!(error, SettingsError::Parse { .. }));
        assert!(error.suggestion().is_some());
    }
}
