//! Auto-save storage trait.
//!
//! A uniform key/value contract over a session-scoped and a persistent
//! string store. Implementations know nothing about entries: values are
//! opaque strings keyed by storage key.

use draftsafe_types::config::StorageOptions;
use draftsafe_types::error::StorageError;

/// Trait for the storage adapter behind an auto-save manager.
///
/// Every failure is returned as a `StorageError` value; callers treat
/// persistence as best-effort. `options.persistent` selects the store for
/// every operation. Uses RPITIT (native async fn in traits, Rust 2024
/// edition).
pub trait AutoSaveStorage: Send + Sync {
    /// Write `value` under `key`, applying compression, encryption and TTL
    /// from `options`.
    fn set(
        &self,
        key: &str,
        value: &str,
        options: &StorageOptions,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Read the decoded value. Returns `None` if missing or expired.
    fn get(
        &self,
        key: &str,
        options: &StorageOptions,
    ) -> impl std::future::Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Delete a key. No-op if the key does not exist.
    fn remove(
        &self,
        key: &str,
        options: &StorageOptions,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Whether a live (unexpired) value exists under `key`.
    fn has(
        &self,
        key: &str,
        options: &StorageOptions,
    ) -> impl std::future::Future<Output = Result<bool, StorageError>> + Send;

    /// List managed keys in the selected store.
    fn keys(
        &self,
        options: &StorageOptions,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Remove every managed key in the selected store.
    fn clear(
        &self,
        options: &StorageOptions,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Dump every managed key in both stores as an opaque blob.
    fn export_data(&self) -> impl std::future::Future<Output = Result<String, StorageError>> + Send;

    /// Restore keys from a blob produced by `export_data`. Returns the
    /// number of keys written.
    fn import_data(
        &self,
        blob: &str,
    ) -> impl std::future::Future<Output = Result<usize, StorageError>> + Send;

    /// Total bytes used by managed keys across both stores.
    fn storage_size(&self) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;
}
