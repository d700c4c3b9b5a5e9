//! In-memory `AutoSaveStorage` for unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use draftsafe_types::config::StorageOptions;
use draftsafe_types::error::StorageError;

use crate::storage::AutoSaveStorage;

#[derive(Default)]
pub struct MockStorage {
    session: Mutex<BTreeMap<String, String>>,
    persistent: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    write_delay_millis: AtomicU64,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `set` sleep for `delay` before it completes.
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_millis
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Write a raw value, bypassing failure injection and the write counter.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.persistent
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.persistent.lock().unwrap().get(key).cloned()
    }

    fn area(&self, options: &StorageOptions) -> &Mutex<BTreeMap<String, String>> {
        if options.persistent {
            &self.persistent
        } else {
            &self.session
        }
    }
}

impl AutoSaveStorage for MockStorage {
    async fn set(
        &self,
        key: &str,
        value: &str,
        options: &StorageOptions,
    ) -> Result<(), StorageError> {
        let delay = self.write_delay_millis.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.area(options)
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str, options: &StorageOptions) -> Result<Option<String>, StorageError> {
        Ok(self.area(options).lock().unwrap().get(key).cloned())
    }

    async fn remove(&self, key: &str, options: &StorageOptions) -> Result<(), StorageError> {
        self.area(options).lock().unwrap().remove(key);
        Ok(())
    }

    async fn has(&self, key: &str, options: &StorageOptions) -> Result<bool, StorageError> {
        Ok(self.area(options).lock().unwrap().contains_key(key))
    }

    async fn keys(&self, options: &StorageOptions) -> Result<Vec<String>, StorageError> {
        Ok(self.area(options).lock().unwrap().keys().cloned().collect())
    }

    async fn clear(&self, options: &StorageOptions) -> Result<(), StorageError> {
        self.area(options).lock().unwrap().clear();
        Ok(())
    }

    async fn export_data(&self) -> Result<String, StorageError> {
        let persistent = self.persistent.lock().unwrap().clone();
        serde_json::to_string(&persistent).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn import_data(&self, blob: &str) -> Result<usize, StorageError> {
        let parsed: BTreeMap<String, String> =
            serde_json::from_str(blob).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let count = parsed.len();
        self.persistent.lock().unwrap().extend(parsed);
        Ok(count)
    }

    async fn storage_size(&self) -> Result<u64, StorageError> {
        let size = |m: &BTreeMap<String, String>| -> u64 {
            m.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum()
        };
        Ok(size(&self.session.lock().unwrap()) + size(&self.persistent.lock().unwrap()))
    }
}
