//! Recovery coordinator.
//!
//! On attach, `RecoveryCoordinator::scan` asks the manager for entries saved
//! under the current path and turns them into `Pending` candidates. The
//! caller then accepts (`Restored`) or dismisses (`Dismissed`) each one.
//! Neither decision deletes anything: entries stay in storage until the
//! caller clears them through the manager (or `discard`).

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use draftsafe_types::entry::AutoSaveEntry;
use draftsafe_types::error::RecoveryError;
use draftsafe_types::recovery::{CandidateState, RecoveryCandidate};

use crate::manager::AutoSaveManager;
use crate::storage::AutoSaveStorage;

/// Keep the newest entry per id, preserving the input order otherwise.
///
/// Input is expected newest-first; later duplicates are dropped and logged.
pub fn dedupe_newest(entries: Vec<AutoSaveEntry>) -> Vec<AutoSaveEntry> {
    let mut best: BTreeMap<String, AutoSaveEntry> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    for entry in entries {
        match best.get(&entry.id) {
            Some(existing) if existing.updated_at >= entry.updated_at => {
                tracing::warn!(id = %entry.id, "duplicate auto-save entry discarded");
            }
            Some(_) => {
                tracing::warn!(id = %entry.id, "duplicate auto-save entry discarded");
                best.insert(entry.id.clone(), entry);
            }
            None => {
                order.push(entry.id.clone());
                best.insert(entry.id.clone(), entry);
            }
        }
    }
    let mut deduped: Vec<AutoSaveEntry> = order.iter().filter_map(|id| best.remove(id)).collect();
    deduped.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    deduped
}

/// Surfaces recoverable entries and tracks the user's decision on each.
pub struct RecoveryCoordinator<S> {
    manager: AutoSaveManager<S>,
    candidates: Mutex<BTreeMap<String, RecoveryCandidate>>,
}

impl<S: AutoSaveStorage + 'static> RecoveryCoordinator<S> {
    pub fn new(manager: AutoSaveManager<S>) -> Self {
        Self {
            manager,
            candidates: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn manager(&self) -> &AutoSaveManager<S> {
        &self.manager
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, RecoveryCandidate>> {
        self.candidates.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Scan storage for entries saved under `path`.
    ///
    /// When `tracked_ids` is non-empty only those ids are considered.
    /// Expired and empty entries are skipped. Candidates already resolved
    /// for the same saved version keep their state; candidates in scope
    /// whose entry disappeared are dropped. Returns the pending candidates
    /// in scope, newest first.
    pub async fn scan(&self, path: &str, tracked_ids: &[&str]) -> Vec<RecoveryCandidate> {
        let wanted: HashSet<&str> = tracked_ids.iter().copied().collect();
        let in_scope =
            |id: &str, entry_path: &str| entry_path == path && (wanted.is_empty() || wanted.contains(id));

        if !self.manager.config().enable_recovery {
            self.lock()
                .retain(|id, c| !in_scope(id.as_str(), c.entry.path.as_str()));
            return Vec::new();
        }

        let found: Vec<AutoSaveEntry> = self
            .manager
            .get_entries_for_path(path)
            .await
            .into_iter()
            .filter(|entry| wanted.is_empty() || wanted.contains(entry.id.as_str()))
            .filter(|entry| !entry.content.trim().is_empty())
            .collect();
        let found = dedupe_newest(found);

        let mut candidates = self.lock();
        let found_ids: HashSet<&str> = found.iter().map(|e| e.id.as_str()).collect();
        candidates.retain(|id, c| {
            !in_scope(id.as_str(), c.entry.path.as_str()) || found_ids.contains(id.as_str())
        });

        for entry in &found {
            let keep_resolved = candidates
                .get(&entry.id)
                .is_some_and(|c| !c.is_pending() && c.entry.updated_at == entry.updated_at);
            if !keep_resolved {
                candidates.insert(entry.id.clone(), RecoveryCandidate::pending(entry.clone()));
            }
        }

        let mut pending: Vec<RecoveryCandidate> = found
            .iter()
            .filter_map(|e| candidates.get(&e.id))
            .filter(|c| c.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.entry.updated_at.cmp(&a.entry.updated_at));
        tracing::debug!(path = %path, candidates = pending.len(), "recovery scan complete");
        pending
    }

    /// Every candidate still awaiting a decision, newest first.
    pub fn pending(&self) -> Vec<RecoveryCandidate> {
        let mut pending: Vec<RecoveryCandidate> =
            self.lock().values().filter(|c| c.is_pending()).cloned().collect();
        pending.sort_by(|a, b| b.entry.updated_at.cmp(&a.entry.updated_at));
        pending
    }

    pub fn candidate(&self, id: &str) -> Option<RecoveryCandidate> {
        self.lock().get(id).cloned()
    }

    fn transition(&self, id: &str, to: CandidateState) -> Result<AutoSaveEntry, RecoveryError> {
        let mut candidates = self.lock();
        let candidate = candidates
            .get_mut(id)
            .ok_or_else(|| RecoveryError::UnknownCandidate(id.to_string()))?;
        if !candidate.is_pending() {
            return Err(RecoveryError::AlreadyResolved {
                id: id.to_string(),
                state: candidate.state.to_string(),
            });
        }
        candidate.state = to;
        Ok(candidate.entry.clone())
    }

    /// Accept a candidate: `Pending -> Restored`.
    ///
    /// The entry is adopted by the manager as its persisted baseline and
    /// stays in storage.
    pub fn accept(&self, id: &str) -> Result<AutoSaveEntry, RecoveryError> {
        let entry = self.transition(id, CandidateState::Restored)?;
        self.manager.adopt_recovered(&entry);
        tracing::debug!(id = %id, "recovery candidate restored");
        Ok(entry)
    }

    /// Dismiss a candidate: `Pending -> Dismissed`. Storage is untouched.
    pub fn dismiss(&self, id: &str) -> Result<(), RecoveryError> {
        self.transition(id, CandidateState::Dismissed)?;
        tracing::debug!(id = %id, "recovery candidate dismissed");
        Ok(())
    }

    /// Dismiss a candidate and delete its stored entry.
    pub async fn discard(&self, id: &str) -> Result<(), RecoveryError> {
        self.dismiss(id)?;
        self.manager.clear_entry(id).await;
        Ok(())
    }
}
