//! In-memory state for one tracked id.

use chrono::{DateTime, Utc};

use draftsafe_types::entry::EntryMetadata;
use draftsafe_types::error::StorageError;

#[derive(Debug, Clone)]
pub(crate) struct TrackedField {
    pub path: String,
    pub metadata: EntryMetadata,
    /// Latest observed content not yet written.
    pub pending: Option<String>,
    /// Generation of the latest observation; deferred writes carrying an
    /// older generation are discarded.
    pub generation: u64,
    /// Latest observed content, whether or not it needs a write.
    pub latest: Option<String>,
    /// Content of the write currently holding the gate.
    pub in_flight: Option<String>,
    /// Content last known to be in storage.
    pub persisted: Option<String>,
    /// Creation time of the stored entry, once known.
    pub created_at: Option<DateTime<Utc>>,
    pub last_error: Option<StorageError>,
}

impl TrackedField {
    pub fn new(path: String, metadata: EntryMetadata, generation: u64) -> Self {
        Self {
            path,
            metadata,
            pending: None,
            generation,
            latest: None,
            in_flight: None,
            persisted: None,
            created_at: None,
            last_error: None,
        }
    }

    /// Record an observation. Returns true when a write is needed.
    ///
    /// The comparison baseline is the in-flight write when there is one,
    /// since that content lands after anything already persisted.
    pub fn observe(&mut self, content: &str, generation: u64) -> bool {
        self.generation = generation;
        self.latest = Some(content.to_string());
        if self.baseline() == Some(content) {
            self.pending = None;
            return false;
        }
        self.pending = Some(content.to_string());
        true
    }

    fn baseline(&self) -> Option<&str> {
        self.in_flight.as_deref().or(self.persisted.as_deref())
    }

    /// Re-mark `written` as pending after its write failed, when the latest
    /// observation still wants it stored.
    pub fn restore_failed(&mut self, written: &str) {
        if self.pending.is_none() && self.latest.as_deref() == Some(written) {
            self.pending = Some(written.to_string());
        }
    }
}

/// Values captured under the per-id gate before a write.
#[derive(Debug)]
pub(crate) struct WriteSnapshot {
    pub content: String,
    pub generation: u64,
    pub path: String,
    pub metadata: EntryMetadata,
    pub created_at: Option<DateTime<Utc>>,
}
