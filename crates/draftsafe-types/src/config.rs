//! Auto-save configuration types.
//!
//! `AutoSaveConfig` is the closed configuration record for one manager.
//! It is loaded from `autosave.toml` in the data directory; every field has
//! a default so an empty file is valid.

use serde::{Deserialize, Serialize};

/// Values larger than this (in bytes) are compressed when compression is
/// requested.
pub const COMPRESS_THRESHOLD_BYTES: usize = 1024;

/// Default total payload budget across managed keys (10 MiB).
pub const DEFAULT_MAX_STORAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Per-write storage options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Durable store when true, session-scoped store when false.
    #[serde(default = "default_persistent")]
    pub persistent: bool,

    /// Compress values whose encoded size exceeds [`COMPRESS_THRESHOLD_BYTES`].
    #[serde(default)]
    pub compress: bool,

    /// Encrypt values (after compression).
    #[serde(default)]
    pub encrypt: bool,

    /// Time-to-live for each write. `None` keeps values until removed.
    #[serde(default = "default_ttl_millis")]
    pub ttl_millis: Option<u64>,
}

fn default_persistent() -> bool {
    true
}

fn default_ttl_millis() -> Option<u64> {
    Some(7 * 24 * 60 * 60 * 1000)
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            persistent: default_persistent(),
            compress: false,
            encrypt: false,
            ttl_millis: default_ttl_millis(),
        }
    }
}

impl StorageOptions {
    /// Session-scoped options with no TTL.
    pub fn session() -> Self {
        Self {
            persistent: false,
            ttl_millis: None,
            ..Self::default()
        }
    }
}

/// Configuration for an auto-save manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    /// Quiet period before a tracked change is written.
    #[serde(default = "default_debounce_millis")]
    pub debounce_millis: u64,

    /// Maximum entries kept per namespace; oldest `updated_at` goes first.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Namespace prefix for entry keys.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// When false, recovery scans report nothing. Writes still happen.
    #[serde(default = "default_enable_recovery")]
    pub enable_recovery: bool,

    /// Payload budget for managed keys in each storage area.
    #[serde(default = "default_max_storage_bytes")]
    pub max_storage_bytes: u64,

    #[serde(default)]
    pub storage_options: StorageOptions,
}

fn default_debounce_millis() -> u64 {
    1000
}

fn default_max_entries() -> usize {
    50
}

fn default_storage_key() -> String {
    "autosave".to_string()
}

fn default_enable_recovery() -> bool {
    true
}

fn default_max_storage_bytes() -> u64 {
    DEFAULT_MAX_STORAGE_BYTES
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce_millis: default_debounce_millis(),
            max_entries: default_max_entries(),
            storage_key: default_storage_key(),
            enable_recovery: default_enable_recovery(),
            max_storage_bytes: default_max_storage_bytes(),
            storage_options: StorageOptions::default(),
        }
    }
}

impl AutoSaveConfig {
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AutoSaveConfig::default();
        assert_eq!(config.debounce_millis, 1000);
        assert_eq!(config.max_entries, 50);
        assert_eq!(config.storage_key, "autosave");
        assert!(config.enable_recovery);
        assert_eq!(config.max_storage_bytes, 10_485_760);
        assert!(config.storage_options.persistent);
        assert_eq!(config.storage_options.ttl_millis, Some(604_800_000));
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: AutoSaveConfig = toml::from_str("").unwrap();
        assert_eq!(config, AutoSaveConfig::default());
    }

    #[test]
    fn test_deserialize_with_values() {
        let toml_str = r#"
debounce_millis = 250
max_entries = 10
storage_key = "coach-notes"
enable_recovery = false

[storage_options]
persistent = false
compress = true
encrypt = true
ttl_millis = 60000
"#;
        let config: AutoSaveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.debounce_millis, 250);
        assert_eq!(config.max_entries, 10);
        assert_eq!(config.storage_key, "coach-notes");
        assert!(!config.enable_recovery);
        assert!(!config.storage_options.persistent);
        assert!(config.storage_options.compress);
        assert!(config.storage_options.encrypt);
        assert_eq!(config.storage_options.ttl_millis, Some(60_000));
    }

    #[test]
    fn test_partial_storage_options() {
        let toml_str = r#"
[storage_options]
compress = true
"#;
        let config: AutoSaveConfig = toml::from_str(toml_str).unwrap();
        assert!(config.storage_options.persistent);
        assert!(config.storage_options.compress);
        assert_eq!(config.storage_options.ttl_millis, Some(604_800_000));
    }

    #[test]
    fn test_session_options() {
        let opts = StorageOptions::session();
        assert!(!opts.persistent);
        assert!(opts.ttl_millis.is_none());
    }
}
