//! Storage-facing types shared by the manager and the adapters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Current version of the export blob format.
pub const EXPORT_VERSION: u32 = 1;

/// Full dump of every managed key, for backup and migration.
///
/// Values are the raw stored envelopes, so encrypted entries stay encrypted
/// in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub session: BTreeMap<String, String>,
    #[serde(default)]
    pub persistent: BTreeMap<String, String>,
}

impl StorageExport {
    pub fn new(exported_at: DateTime<Utc>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at,
            session: BTreeMap::new(),
            persistent: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.session.len() + self.persistent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of an explicit save request.
///
/// Failures are values rather than errors so callers flushing before
/// navigation can warn the user without unwinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Content was written.
    Saved,
    /// Content matched the last persisted value; nothing was written.
    Unchanged,
    /// The id has no pending content.
    NothingPending,
    /// The write failed; the content is still held in memory.
    Failed(StorageError),
}

impl SaveOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SaveOutcome::Failed(_))
    }
}

/// What teardown does with content that has not been written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    #[default]
    Flush,
    Discard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_roundtrip() {
        let mut export = StorageExport::new(Utc::now());
        export
            .persistent
            .insert("autosave.notes".to_string(), "{}".to_string());
        let json = serde_json::to_string(&export).unwrap();
        let parsed: StorageExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, export);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn export_missing_sections_default_empty() {
        let parsed: StorageExport =
            serde_json::from_str(r#"{"version":1,"exported_at":"2026-01-01T00:00:00Z"}"#).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn save_outcome_failure() {
        assert!(SaveOutcome::Failed(StorageError::Unavailable("x".into())).is_failure());
        assert!(!SaveOutcome::Saved.is_failure());
    }
}
