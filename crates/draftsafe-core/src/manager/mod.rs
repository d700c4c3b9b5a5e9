//! Auto-save manager.
//!
//! `AutoSaveManager` owns the lifecycle of every entry: it debounces change
//! observations per id, writes the latest content through the storage port,
//! enumerates recoverable entries, and deletes entries on request.
//!
//! Ordering: writes for one id are serialized by a per-id async gate, and
//! every write persists the latest observed content. A deferred write whose
//! generation has been superseded is discarded once it reaches the gate, so
//! an older write can never land after a newer one.
//!
//! Failures from storage never escape `track_change`; they are logged (a
//! warning the first time, debug afterwards) and kept on the tracked field.

mod tracked;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use draftsafe_types::config::{AutoSaveConfig, StorageOptions};
use draftsafe_types::entry::{AutoSaveEntry, EntryMetadata};
use draftsafe_types::error::StorageError;
use draftsafe_types::storage::{SaveOutcome, TeardownPolicy};

use crate::clock::{Clock, SystemClock};
use crate::codec::{decode_entry, encode_entry, entry_id, entry_key};
use crate::scheduler::DeferredScheduler;
use crate::storage::AutoSaveStorage;

use tracked::{TrackedField, WriteSnapshot};

struct Inner<S> {
    storage: S,
    config: AutoSaveConfig,
    clock: Arc<dyn Clock>,
    scheduler: DeferredScheduler,
    fields: DashMap<String, TrackedField>,
    /// Per-id write gates. `clear_entry` drops a gate only when no other
    /// write or clear holds a handle to it.
    gates: DashMap<String, Arc<Mutex<()>>>,
    generations: AtomicU64,
    failure_logged: AtomicBool,
}

/// Debounced, best-effort persistence of tracked content.
///
/// Cloning yields another handle to the same manager. `track_change`
/// spawns deferred writes, so the manager must be used from within a tokio
/// runtime.
pub struct AutoSaveManager<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for AutoSaveManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for AutoSaveManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaveManager")
            .field("namespace", &self.inner.config.storage_key)
            .field("tracked", &self.inner.fields.len())
            .field("pending_writes", &self.inner.scheduler.pending_count())
            .finish()
    }
}

impl<S: AutoSaveStorage + 'static> AutoSaveManager<S> {
    /// Create a manager over `storage` using the system clock.
    pub fn new(storage: S, config: AutoSaveConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: S, config: AutoSaveConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                config,
                clock,
                scheduler: DeferredScheduler::new(),
                fields: DashMap::new(),
                gates: DashMap::new(),
                generations: AtomicU64::new(1),
                failure_logged: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.inner.config
    }

    pub fn storage(&self) -> &S {
        &self.inner.storage
    }

    fn options(&self) -> &StorageOptions {
        &self.inner.config.storage_options
    }

    fn key(&self, id: &str) -> String {
        entry_key(&self.inner.config.storage_key, id)
    }

    fn next_generation(&self) -> u64 {
        self.inner.generations.fetch_add(1, Ordering::Relaxed)
    }

    fn gate(&self, id: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.inner.gates.entry(id.to_string()).or_default().value())
    }

    // -----------------------------------------------------------------------
    // Change tracking
    // -----------------------------------------------------------------------

    /// Record a content observation for `id`.
    ///
    /// Calls within `debounce_millis` of each other coalesce into one write
    /// carrying the latest content. Content equal to the last persisted
    /// value schedules nothing and cancels any waiting write.
    pub fn track_change(&self, id: &str, content: &str, path: &str, metadata: EntryMetadata) {
        let generation = self.next_generation();
        let needs_write = {
            let mut field = self
                .inner
                .fields
                .entry(id.to_string())
                .or_insert_with(|| TrackedField::new(path.to_string(), metadata.clone(), generation));
            field.path = path.to_string();
            field.metadata = metadata;
            field.observe(content, generation)
        };

        if !needs_write {
            self.inner.scheduler.cancel(id);
            tracing::trace!(id = %id, "content matches last save, write skipped");
            return;
        }

        let manager = self.clone();
        let owned_id = id.to_string();
        self.inner
            .scheduler
            .schedule(id, self.inner.config.debounce(), async move {
                manager.persist(&owned_id, Some(generation)).await;
            });
    }

    /// Write the pending content for `id` immediately.
    ///
    /// Resolves after the write completes or fails.
    pub async fn force_save(&self, id: &str) -> SaveOutcome {
        self.inner.scheduler.cancel(id);
        self.persist(id, None).await
    }

    /// Force-save every tracked id. Used before navigation or unload.
    pub async fn flush_all(&self) -> Vec<(String, SaveOutcome)> {
        let ids: Vec<String> = self.inner.fields.iter().map(|r| r.key().clone()).collect();
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            let outcome = self.force_save(&id).await;
            outcomes.push((id, outcome));
        }
        outcomes
    }

    /// Drop the pending write for `id` without touching storage.
    ///
    /// Returns whether content was pending.
    pub fn cancel_pending(&self, id: &str) -> bool {
        self.inner.scheduler.cancel(id);
        let generation = self.next_generation();
        match self.inner.fields.get_mut(id) {
            Some(mut field) => {
                field.generation = generation;
                field.latest = None;
                field.pending.take().is_some()
            }
            None => false,
        }
    }

    /// Whether `id` (or any id, when `None`) holds work that has not been
    /// cleared by the caller.
    ///
    /// Auto-saved content still counts as unsaved: only `clear_entry` and
    /// `clear_all_entries` mark work as done.
    pub fn has_unsaved_changes(&self, id: Option<&str>) -> bool {
        match id {
            Some(id) => self.inner.fields.contains_key(id),
            None => !self.inner.fields.is_empty(),
        }
    }

    /// The last storage failure seen for `id`, if its latest write failed.
    pub fn last_error(&self, id: &str) -> Option<StorageError> {
        self.inner
            .fields
            .get(id)
            .and_then(|field| field.last_error.clone())
    }

    pub fn tracked_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.fields.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of writes waiting for their debounce window.
    pub fn pending_writes(&self) -> usize {
        self.inner.scheduler.pending_count()
    }

    /// Record a restored entry as the persisted baseline for its id.
    ///
    /// Re-applying the restored content to an element then schedules no
    /// write, and later saves keep the entry's original `created_at`.
    pub fn adopt_recovered(&self, entry: &AutoSaveEntry) {
        let generation = self.next_generation();
        let mut field = self.inner.fields.entry(entry.id.clone()).or_insert_with(|| {
            TrackedField::new(entry.path.clone(), entry.metadata.clone(), generation)
        });
        field.persisted = Some(entry.content.clone());
        field.created_at = Some(entry.created_at);
        if field.pending.as_deref() == Some(entry.content.as_str()) {
            field.pending = None;
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    async fn persist(&self, id: &str, expected_generation: Option<u64>) -> SaveOutcome {
        let gate = self.gate(id);
        let _guard = gate.lock().await;

        let snapshot = match self.snapshot_for_write(id, expected_generation) {
            Ok(snapshot) => snapshot,
            Err(outcome) => return outcome,
        };

        let (created_at, is_new) = match snapshot.created_at {
            Some(created_at) => (created_at, false),
            None => match self.load_entry(id).await {
                Some(existing) => (existing.created_at, false),
                None => (self.inner.clock.now(), true),
            },
        };

        let now = self.inner.clock.now();
        let mut entry = AutoSaveEntry {
            id: id.to_string(),
            content: snapshot.content.clone(),
            path: snapshot.path,
            created_at,
            updated_at: now.max(created_at),
            expires_at: None,
            metadata: snapshot.metadata,
        };
        entry.expires_at = self.expiry_after(entry.updated_at);

        let encoded = match encode_entry(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                let err = StorageError::Serialization(e.to_string());
                if let Some(mut field) = self.inner.fields.get_mut(id) {
                    field.in_flight = None;
                    field.restore_failed(&snapshot.content);
                }
                self.record_failure(id, &err);
                return SaveOutcome::Failed(err);
            }
        };

        let result = self.inner.storage.set(&self.key(id), &encoded, self.options()).await;
        if let Some(mut field) = self.inner.fields.get_mut(id) {
            field.in_flight = None;
            match &result {
                Ok(()) => {
                    field.persisted = Some(snapshot.content.clone());
                    field.created_at = Some(created_at);
                    field.last_error = None;
                    if field.generation == snapshot.generation {
                        field.pending = None;
                    }
                }
                Err(_) => field.restore_failed(&snapshot.content),
            }
        }
        match result {
            Ok(()) => {
                tracing::debug!(id = %id, bytes = entry.content_len(), "auto-saved");
                if is_new {
                    self.enforce_max_entries(id).await;
                }
                SaveOutcome::Saved
            }
            Err(err) => {
                self.record_failure(id, &err);
                SaveOutcome::Failed(err)
            }
        }
    }

    /// Expiry for an entry written at `updated_at`. A TTL too large to
    /// represent means no expiry.
    fn expiry_after(&self, updated_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = self.options().ttl_millis.filter(|ttl| *ttl > 0)?;
        let ttl = ChronoDuration::try_milliseconds(i64::try_from(ttl).ok()?)?;
        updated_at.checked_add_signed(ttl)
    }

    /// Capture what to write under the gate, or the outcome when there is
    /// nothing to write.
    fn snapshot_for_write(
        &self,
        id: &str,
        expected_generation: Option<u64>,
    ) -> Result<WriteSnapshot, SaveOutcome> {
        let Some(mut field) = self.inner.fields.get_mut(id) else {
            return Err(SaveOutcome::NothingPending);
        };
        if let Some(expected) = expected_generation {
            if field.generation != expected {
                tracing::trace!(id = %id, "superseded deferred write discarded");
                return Err(SaveOutcome::NothingPending);
            }
        }
        let Some(content) = field.pending.clone() else {
            return Err(SaveOutcome::NothingPending);
        };
        if field.persisted.as_deref() == Some(content.as_str()) {
            field.pending = None;
            return Err(SaveOutcome::Unchanged);
        }
        field.in_flight = Some(content.clone());
        Ok(WriteSnapshot {
            content,
            generation: field.generation,
            path: field.path.clone(),
            metadata: field.metadata.clone(),
            created_at: field.created_at,
        })
    }

    fn record_failure(&self, id: &str, err: &StorageError) {
        if let Some(mut field) = self.inner.fields.get_mut(id) {
            field.last_error = Some(err.clone());
        }
        if self.inner.failure_logged.swap(true, Ordering::Relaxed) {
            tracing::debug!(id = %id, error = %err, "auto-save write failed");
        } else {
            tracing::warn!(
                id = %id,
                error = %err,
                "auto-save write failed; changes are kept in memory only"
            );
        }
    }

    /// Evict oldest entries (by `updated_at`) beyond `max_entries`.
    ///
    /// `keep` is the id just written; it is never evicted. A limit of 0
    /// disables the bound.
    async fn enforce_max_entries(&self, keep: &str) {
        let max = self.inner.config.max_entries;
        if max == 0 {
            return;
        }
        let mut entries = self.load_live_entries().await;
        if entries.len() <= max {
            return;
        }
        entries.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        let excess = entries.len() - max;
        for entry in entries.iter().filter(|e| e.id != keep).take(excess) {
            if let Err(e) = self.inner.storage.remove(&self.key(&entry.id), self.options()).await {
                tracing::debug!(id = %entry.id, error = %e, "eviction failed");
                continue;
            }
            if let Some(mut field) = self.inner.fields.get_mut(&entry.id) {
                field.persisted = None;
                field.created_at = None;
            }
            tracing::debug!(id = %entry.id, "evicted oldest entry over max_entries");
        }
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Load one stored entry, or `None` when missing, expired, or corrupt.
    pub async fn get_entry(&self, id: &str) -> Option<AutoSaveEntry> {
        self.load_entry(id).await
    }

    async fn load_entry(&self, id: &str) -> Option<AutoSaveEntry> {
        let key = self.key(id);
        let raw = match self.inner.storage.get(&key, self.options()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "auto-save read failed");
                return None;
            }
        };
        self.accept_raw(id, &key, &raw).await
    }

    /// Decode and validate a stored value, removing it when unusable.
    async fn accept_raw(&self, id: &str, key: &str, raw: &str) -> Option<AutoSaveEntry> {
        let entry = match decode_entry(raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable auto-save entry");
                let _ = self.inner.storage.remove(key, self.options()).await;
                return None;
            }
        };
        if entry.id != id {
            tracing::warn!(key = %key, "discarding auto-save entry stored under a foreign key");
            let _ = self.inner.storage.remove(key, self.options()).await;
            return None;
        }
        if entry.is_expired_at(self.inner.clock.now()) {
            tracing::debug!(key = %key, "removing expired auto-save entry");
            let _ = self.inner.storage.remove(key, self.options()).await;
            return None;
        }
        Some(entry)
    }

    async fn load_live_entries(&self) -> Vec<AutoSaveEntry> {
        let keys = match self.inner.storage.keys(self.options()).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::debug!(error = %e, "auto-save key listing failed");
                return Vec::new();
            }
        };

        let namespace = &self.inner.config.storage_key;
        let mut entries: Vec<AutoSaveEntry> = Vec::new();
        for key in &keys {
            let Some(id) = entry_id(namespace, key) else {
                continue;
            };
            if let Some(entry) = self.load_entry(id).await {
                entries.push(entry);
            }
        }
        entries
    }

    /// Every live entry in the namespace, newest `updated_at` first.
    pub async fn get_unsaved_entries(&self) -> Vec<AutoSaveEntry> {
        let mut entries = self.load_live_entries().await;
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries
    }

    /// Live entries belonging to `path`, newest `updated_at` first.
    pub async fn get_entries_for_path(&self, path: &str) -> Vec<AutoSaveEntry> {
        let mut entries = self.get_unsaved_entries().await;
        entries.retain(|entry| entry.path == path);
        entries
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Forget `id` and delete its stored entry.
    ///
    /// Cancels any waiting write first, then waits for an in-flight write to
    /// finish before removing the key, so deleted content cannot come back.
    pub async fn clear_entry(&self, id: &str) {
        self.inner.scheduler.cancel(id);
        self.inner.fields.remove(id);

        let gate = self.gate(id);
        {
            let _guard = gate.lock().await;
            let key = self.key(id);
            if let Err(e) = self.inner.storage.remove(&key, self.options()).await {
                tracing::debug!(key = %key, error = %e, "auto-save removal failed");
            }
        }
        self.inner
            .gates
            .remove_if(id, |_, held| Arc::ptr_eq(held, &gate) && Arc::strong_count(held) == 2);
        tracing::debug!(id = %id, "auto-save entry cleared");
    }

    /// Number of per-id write gates currently held.
    pub fn gate_count(&self) -> usize {
        self.inner.gates.len()
    }

    /// Forget every tracked id and delete every entry in the namespace.
    pub async fn clear_all_entries(&self) {
        self.inner.scheduler.cancel_all();
        let mut ids: Vec<String> = self.inner.fields.iter().map(|r| r.key().clone()).collect();
        self.inner.fields.clear();

        if let Ok(keys) = self.inner.storage.keys(self.options()).await {
            let namespace = &self.inner.config.storage_key;
            ids.extend(keys.iter().filter_map(|k| entry_id(namespace, k)).map(str::to_string));
        }
        ids.sort();
        ids.dedup();

        for id in &ids {
            self.clear_entry(id).await;
        }
        tracing::debug!(count = ids.len(), "all auto-save entries cleared");
    }

    /// Stop the manager: cancel every waiting write, then flush or discard
    /// pending content according to `policy`.
    pub async fn shutdown(&self, policy: TeardownPolicy) -> usize {
        let cancelled = self.inner.scheduler.cancel_all();
        let handled = match policy {
            TeardownPolicy::Flush => self
                .flush_all()
                .await
                .iter()
                .filter(|(_, outcome)| *outcome == SaveOutcome::Saved)
                .count(),
            TeardownPolicy::Discard => {
                let ids: Vec<String> =
                    self.inner.fields.iter().map(|r| r.key().clone()).collect();
                ids.iter().filter(|id| self.cancel_pending(id)).count()
            }
        };
        tracing::debug!(?policy, cancelled, handled, "auto-save manager shut down");
        handled
    }
}
