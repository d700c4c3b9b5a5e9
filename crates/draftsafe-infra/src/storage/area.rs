//! Raw key/value areas.
//!
//! A `StorageArea` is the environment's string store: synchronous, with an
//! optional byte quota counted as key length plus value length. Areas know
//! nothing about envelopes, prefixes, or expiry.

use draftsafe_types::error::StorageError;

pub trait StorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Fails with `QuotaExceeded` when the write would exceed the quota.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Every key in the area, including keys other writers own.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    fn used_bytes(&self) -> Result<u64, StorageError>;
}

pub(crate) fn item_bytes(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

/// Quota check shared by the bundled areas.
pub(crate) fn check_quota(
    quota: Option<u64>,
    used: u64,
    replaced: u64,
    incoming: u64,
) -> Result<(), StorageError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let after = used.saturating_sub(replaced) + incoming;
    if after > quota {
        return Err(StorageError::QuotaExceeded {
            needed: incoming,
            available: quota.saturating_sub(used.saturating_sub(replaced)),
        });
    }
    Ok(())
}
