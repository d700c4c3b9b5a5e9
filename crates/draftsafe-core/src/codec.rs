//! Entry codec and namespace key mapping.
//!
//! `encode_entry`/`decode_entry` convert between `AutoSaveEntry` and its
//! stored JSON text. Decoding goes through a permissive wire shape so a
//! missing `id` or `content` is reported as a classified `CodecError`
//! rather than a generic parse failure.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use draftsafe_types::entry::{AutoSaveEntry, EntryMetadata};
use draftsafe_types::error::CodecError;

/// Separator between namespace and id in storage keys.
const KEY_SEPARATOR: char = '.';

#[derive(Deserialize)]
struct WireEntry {
    id: Option<String>,
    content: Option<String>,
    #[serde(default)]
    path: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<EntryMetadata>,
}

/// Serialize an entry to its stored JSON form.
pub fn encode_entry(entry: &AutoSaveEntry) -> Result<String, CodecError> {
    serde_json::to_string(entry).map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Parse stored JSON back into an entry.
///
/// `id` and `content` are required; `path` defaults to empty and metadata
/// to empty. Timestamps are required and must satisfy
/// `created_at <= updated_at`.
pub fn decode_entry(raw: &str) -> Result<AutoSaveEntry, CodecError> {
    let wire: WireEntry =
        serde_json::from_str(raw).map_err(|e| CodecError::Malformed(e.to_string()))?;

    let id = wire.id.ok_or(CodecError::MissingField("id"))?;
    if id.is_empty() {
        return Err(CodecError::Invariant("id must not be empty".to_string()));
    }
    let content = wire.content.ok_or(CodecError::MissingField("content"))?;
    let created_at = wire.created_at.ok_or(CodecError::MissingField("created_at"))?;
    let updated_at = wire.updated_at.ok_or(CodecError::MissingField("updated_at"))?;
    if created_at > updated_at {
        return Err(CodecError::Invariant(
            "created_at is later than updated_at".to_string(),
        ));
    }

    Ok(AutoSaveEntry {
        id,
        content,
        path: wire.path.unwrap_or_default(),
        created_at,
        updated_at,
        expires_at: wire.expires_at,
        metadata: wire.metadata.unwrap_or_default(),
    })
}

/// Storage key for `id` inside `namespace`.
pub fn entry_key(namespace: &str, id: &str) -> String {
    format!("{namespace}{KEY_SEPARATOR}{id}")
}

/// Recover the entry id from a storage key, if the key belongs to `namespace`.
pub fn entry_id<'a>(namespace: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use draftsafe_types::entry::FieldKind;

    fn sample() -> AutoSaveEntry {
        let now = Utc::now();
        let mut entry = AutoSaveEntry::new("client-intake", "<p>Goals: 5k</p>", "/clients/42", now);
        entry.updated_at = now + Duration::seconds(3);
        entry.expires_at = Some(now + Duration::days(7));
        entry.metadata = EntryMetadata {
            field_kind: Some(FieldKind::ContentEditable),
            form_name: Some("intake".to_string()),
            label: None,
        };
        entry
    }

    #[test]
    fn encode_then_decode_preserves_every_field() {
        let entry = sample();
        let decoded = decode_entry(&encode_entry(&entry).unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn decode_rejects_missing_id() {
        let raw = r#"{"content":"x","created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}"#;
        assert_eq!(decode_entry(raw).unwrap_err(), CodecError::MissingField("id"));
    }

    #[test]
    fn decode_rejects_missing_content() {
        let raw = r#"{"id":"a","created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}"#;
        assert_eq!(
            decode_entry(raw).unwrap_err(),
            CodecError::MissingField("content")
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_entry("not json at all"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(decode_entry("[1,2,3]"), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_inverted_timestamps() {
        let raw = r#"{"id":"a","content":"x","created_at":"2026-01-02T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}"#;
        assert!(matches!(decode_entry(raw), Err(CodecError::Invariant(_))));
    }

    #[test]
    fn decode_defaults_optional_fields() {
        let raw = r#"{"id":"a","content":"","created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}"#;
        let entry = decode_entry(raw).unwrap();
        assert_eq!(entry.path, "");
        assert_eq!(entry.metadata, EntryMetadata::default());
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn key_mapping() {
        let key = entry_key("autosave", "user-profile-name");
        assert_eq!(key, "autosave.user-profile-name");
        assert_eq!(entry_id("autosave", &key), Some("user-profile-name"));
        assert_eq!(entry_id("autosave", "autosaved.x"), None);
        assert_eq!(entry_id("autosave", "autosave."), None);
        assert_eq!(entry_id("other", &key), None);
    }

    #[test]
    fn ids_containing_separator_survive() {
        let key = entry_key("ns", "form.section.field");
        assert_eq!(entry_id("ns", &key), Some("form.section.field"));
    }
}
