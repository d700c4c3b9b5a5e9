//! Recovery candidate types.
//!
//! A candidate moves `Pending -> Restored` or `Pending -> Dismissed` exactly
//! once. Neither transition touches storage.

use serde::{Deserialize, Serialize};

use crate::entry::AutoSaveEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateState {
    Pending,
    Restored,
    Dismissed,
}

impl std::fmt::Display for CandidateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateState::Pending => write!(f, "pending"),
            CandidateState::Restored => write!(f, "restored"),
            CandidateState::Dismissed => write!(f, "dismissed"),
        }
    }
}

/// A recoverable entry offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryCandidate {
    pub entry: AutoSaveEntry,
    pub state: CandidateState,
}

impl RecoveryCandidate {
    pub fn pending(entry: AutoSaveEntry) -> Self {
        Self {
            entry,
            state: CandidateState::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn is_pending(&self) -> bool {
        self.state == CandidateState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn pending_candidate() {
        let entry = AutoSaveEntry::new("notes-field", "hello", "/editor", Utc::now());
        let candidate = RecoveryCandidate::pending(entry);
        assert!(candidate.is_pending());
        assert_eq!(candidate.id(), "notes-field");
    }

    #[test]
    fn state_display() {
        assert_eq!(CandidateState::Restored.to_string(), "restored");
        assert_eq!(CandidateState::Dismissed.to_string(), "dismissed");
    }
}
