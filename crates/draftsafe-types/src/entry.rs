//! Auto-save entry types.
//!
//! An `AutoSaveEntry` is one persisted unit of unsaved user input, keyed by
//! a caller-supplied stable id and scoped to an application path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of element an entry was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Input,
    Textarea,
    ContentEditable,
    /// A whole form; content is a JSON object of field name to value.
    Form,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Input => write!(f, "input"),
            FieldKind::Textarea => write!(f, "textarea"),
            FieldKind::ContentEditable => write!(f, "content_editable"),
            FieldKind::Form => write!(f, "form"),
        }
    }
}

/// Caller-supplied context stored alongside an entry.
///
/// A closed record rather than a free-form map so the stored shape is
/// checkable on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_kind: Option<FieldKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EntryMetadata {
    pub fn with_kind(kind: FieldKind) -> Self {
        Self {
            field_kind: Some(kind),
            ..Self::default()
        }
    }
}

/// One persisted unit of unsaved work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveEntry {
    /// Stable caller-supplied identifier, unique within a namespace.
    pub id: String,
    /// Raw value to restore (text, HTML, or serialized form state).
    pub content: String,
    /// Application route the entry belongs to.
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: EntryMetadata,
}

impl AutoSaveEntry {
    /// Create a fresh entry whose creation and update times are both `now`.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        path: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            path: path.into(),
            created_at: now,
            updated_at: now,
            expires_at: None,
            metadata: EntryMetadata::default(),
        }
    }

    /// Whether the entry's expiry has passed at `now`.
    ///
    /// An entry expiring exactly at `now` is still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    /// Replace content in place, keeping `created_at`.
    ///
    /// `updated_at` never moves behind `created_at`, even if the clock
    /// stepped backwards between saves.
    pub fn touch(&mut self, content: impl Into<String>, now: DateTime<Utc>) {
        self.content = content.into();
        self.updated_at = now.max(self.created_at);
    }

    /// Approximate payload size used for logging and stats.
    pub fn content_len(&self) -> usize {
        self.content.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(now: DateTime<Utc>) -> AutoSaveEntry {
        AutoSaveEntry::new("user-profile-name", "Ada", "/profile", now)
    }

    #[test]
    fn new_entry_has_equal_timestamps() {
        let now = Utc::now();
        let entry = sample(now);
        assert_eq!(entry.created_at, entry.updated_at);
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn touch_keeps_created_at() {
        let now = Utc::now();
        let mut entry = sample(now);
        entry.touch("Ada Lovelace", now + Duration::seconds(5));
        assert_eq!(entry.created_at, now);
        assert_eq!(entry.updated_at, now + Duration::seconds(5));
        assert_eq!(entry.content, "Ada Lovelace");
    }

    #[test]
    fn touch_with_backwards_clock_clamps() {
        let now = Utc::now();
        let mut entry = sample(now);
        entry.touch("x", now - Duration::seconds(30));
        assert_eq!(entry.updated_at, entry.created_at);
    }

    #[test]
    fn expiry_boundary() {
        let now = Utc::now();
        let mut entry = sample(now);
        entry.expires_at = Some(now + Duration::seconds(10));
        assert!(!entry.is_expired_at(now + Duration::seconds(10)));
        assert!(entry.is_expired_at(now + Duration::milliseconds(10_001)));
    }

    #[test]
    fn field_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FieldKind::ContentEditable).unwrap();
        assert_eq!(json, "\"content_editable\"");
        assert_eq!(FieldKind::Textarea.to_string(), "textarea");
    }

    #[test]
    fn empty_metadata_omits_fields() {
        let json = serde_json::to_string(&EntryMetadata::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
