//! In-memory area, used for session-scoped storage and in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use draftsafe_types::error::StorageError;

use super::area::{StorageArea, check_quota, item_bytes};

#[derive(Debug, Default)]
pub struct MemoryArea {
    items: Mutex<BTreeMap<String, String>>,
    quota: Option<u64>,
    unavailable: AtomicBool,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Make every call fail with `Unavailable`, as a blocked or disabled
    /// store would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn items(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("session area disabled".to_string()));
        }
        Ok(self.items.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl StorageArea for MemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items()?;
        let used: u64 = items.iter().map(|(k, v)| item_bytes(k, v)).sum();
        let replaced = items.get(key).map_or(0, |v| item_bytes(key, v));
        check_quota(self.quota, used, replaced, item_bytes(key, value))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items()?.keys().cloned().collect())
    }

    fn used_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.items()?.iter().map(|(k, v)| item_bytes(k, v)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_counts_keys_and_values() {
        let area = MemoryArea::with_quota(10);
        area.set_item("ab", "cdef").unwrap();
        assert_eq!(area.used_bytes().unwrap(), 6);

        let err = area.set_item("gh", "ijk").unwrap_err();
        assert_eq!(err, StorageError::QuotaExceeded { needed: 5, available: 4 });

        // Replacing an existing value only counts the difference.
        area.set_item("ab", "cdefghij").unwrap();
        assert_eq!(area.used_bytes().unwrap(), 10);
    }

    #[test]
    fn unavailable_area_rejects_everything() {
        let area = MemoryArea::new();
        area.set_item("k", "v").unwrap();
        area.set_unavailable(true);
        assert!(matches!(area.get_item("k"), Err(StorageError::Unavailable(_))));
        assert!(matches!(area.set_item("k", "w"), Err(StorageError::Unavailable(_))));

        area.set_unavailable(false);
        assert_eq!(area.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
