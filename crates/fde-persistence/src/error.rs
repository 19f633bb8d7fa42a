//! Persistence error types.
//!
//! Storage operations return structured errors that provide user-friendly
//! messages and optional remediation hints.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The medium has no room for the value.
    #[error("Storage quota exceeded while writing '{key}' ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// The medium cannot be used at all.
    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// Snapshot written by an incompatible version.
    #[error("Snapshot version {found} is not supported (expected {expected})")]
    UnsupportedVersion {
        found: String,
        expected: &'static str,
    },

    /// Serialization error.
    #[error("Failed to serialize draft data")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization error.
    #[error("Failed to deserialize draft '{key}'")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the draft file at {}", operation, path.display())
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the draft to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::QuotaExceeded { .. } => {
                "There is not enough storage space left to save your draft.".to_string()
            }
            Self::Unavailable { reason } => {
                format!("Draft storage is not available: {reason}")
            }
            Self::UnsupportedVersion { found, .. } => {
                format!(
                    "The saved draft was created by an incompatible version (version {found}) \
                    and cannot be restored."
                )
            }
            Self::Serialization { .. } => {
                "An error occurred while saving the draft.".to_string()
            }
            Self::Deserialization { .. } => {
                "An error occurred while reading the saved draft. It may be corrupted.".to_string()
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that you have permission to read the draft directory.".into())
                } else {
                    Some("Check that you have permission to write to the draft directory.".into())
                }
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or choose a different draft directory.".into())
            }
            Self::QuotaExceeded { .. } => {
                Some("Clear old drafts to make room for new ones.".into())
            }
            Self::Unavailable { .. } => None,
            Self::UnsupportedVersion { .. } | Self::Deserialization { .. } => {
                Some("Clear the saved draft and start over.".into())
            }
            Self::Serialization { .. } => None,
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message_and_suggestion() {
        let error = PersistenceError::QuotaExceeded {
            key: "draft".into(),
            needed: 10,
            available: 4,
        };
        assert_eq!(
            error.to_string(),
            "Storage quota exceeded while writing 'draft' (10 bytes, 4 available)"
        );
        assert!(error.user_message().contains("not enough storage"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_io_suggestion_depends_on_operation() {
        let io = |operation| PersistenceError::Io {
            operation,
            path: PathBuf::from("/tmp/draft.json"),
            source: std::io::Error::other("boom"),
        };
        assert!(io("read").suggestion().unwrap().contains("read"));
        assert!(io("write").suggestion().unwrap().contains("write"));
    }
}
