//! Snapshot envelope and the adapter that reads and writes it.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fde_model::FormValues;
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, Result};
use crate::storage::StorageMedium;

/// Envelope version written by this crate. Other versions are not restored.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Persisted draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: FormValues,
    /// Save time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub version: String,
}

impl Snapshot {
    /// Snapshot of `data` stamped with the current time.
    pub fn new(data: FormValues) -> Self {
        Self {
            data,
            timestamp: fde_common::now_millis(),
            version: SNAPSHOT_VERSION.to_string(),
        }
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| PersistenceError::Serialization { source })
    }

    /// Parse a stored envelope, rejecting other versions.
    pub fn decode(key: &str, raw: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(raw).map_err(|source| PersistenceError::Deserialization {
                key: key.to_string(),
                source,
            })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

/// The only component that talks to a [`StorageMedium`].
#[derive(Clone)]
pub struct SnapshotStore {
    medium: Arc<dyn StorageMedium>,
}

impl SnapshotStore {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self { medium }
    }

    pub fn write(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let encoded = snapshot.encode()?;
        self.medium.set(key, &encoded)
    }

    /// Last snapshot under `key`.
    ///
    /// Unreadable, unparsable, and incompatible snapshots read as `None`.
    pub fn read(&self, key: &str) -> Option<Snapshot> {
        let raw = match self.medium.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read draft");
                return None;
            }
        };
        match Snapshot::decode(key, &raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring stored draft");
                None
            }
        }
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.medium.remove(key)
    }
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}
