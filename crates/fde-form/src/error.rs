//! Form error types.

use std::path::PathBuf;

use fde_validate::ValidationSummary;
use thiserror::Error;

/// Why a submit did not reach or did not pass the handler.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Validation failed; the handler was not called.
    #[error("Form has {} invalid field(s)", .summary.error_count)]
    Invalid { summary: ValidationSummary },

    /// The handler returned an error.
    #[error("Submit handler failed: {0:#}")]
    Handler(anyhow::Error),

    /// The form was disposed.
    #[error("Form has been disposed")]
    Disposed,
}

impl SubmitError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid { summary } => match summary.error_count {
                1 => "Please correct the highlighted field before submitting.".to_string(),
                n => format!("Please correct the {n} highlighted fields before submitting."),
            },
            Self::Handler(_) => "Your form could not be submitted.".to_string(),
            Self::Disposed => "This form is no longer active.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Invalid { .. } => None,
            Self::Handler(_) => {
                Some("Your draft is still saved. Try submitting again in a moment.".into())
            }
            Self::Disposed => Some("Reopen the form and try again.".into()),
        }
    }
}

/// Settings file error.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File I/O error.
    #[error("Failed to {operation} settings file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid settings TOML.
    #[error("Invalid settings file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Serialization error.
    #[error("Failed to serialize settings")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },

    /// The platform config directory cannot be determined.
    #[error("Could not determine settings path")]
    NoConfigDir,
}

impl SettingsError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the settings file at {}", operation, path.display()),
            Self::Parse { path, .. } => {
                format!("The settings file at {} could not be read.", path.display())
            }
            Self::Serialize { .. } => "An error occurred while saving the settings.".to_string(),
            Self::NoConfigDir => "No settings folder is available on this system.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { .. } => Some("Check the permissions of the settings folder.".into()),
            Self::Parse { .. } => {
                Some("Fix the file or delete it to restore the defaults.".into())
            }
            Self::Serialize { .. } | Self::NoConfigDir => None,
        }
    }
}

/// Result type alias for submit.
pub type Result<T> = std::result::Result<T, SubmitError>;
