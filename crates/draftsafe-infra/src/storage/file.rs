//! File-backed area: one JSON object on disk, rewritten atomically.
//!
//! The whole map is cached in memory and written through on every change
//! (temp file + rename), so a crash mid-write leaves the previous version.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use draftsafe_types::error::StorageError;

use super::area::{StorageArea, check_quota, item_bytes};

#[derive(Debug)]
pub struct FileArea {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
    quota: Option<u64>,
}

impl FileArea {
    /// Open (or create on first write) the area stored at `path`.
    ///
    /// An unreadable file is moved aside to `<path>.corrupt` and the area
    /// starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(items) => items,
                Err(err) => {
                    let aside = corrupt_path(&path);
                    tracing::warn!(
                        "Failed to parse {}: {err}, moving it to {}",
                        path.display(),
                        aside.display()
                    );
                    std::fs::rename(&path, &aside).map_err(io_err)?;
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(io_err(err)),
        };
        tracing::debug!(path = %path.display(), keys = items.len(), "file area opened");
        Ok(Self {
            path,
            items: Mutex::new(items),
            quota: None,
        })
    }

    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn items(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_through(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string(items)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn io_err(err: std::io::Error) -> StorageError {
    StorageError::Io(err.to_string())
}

impl StorageArea for FileArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items();
        let used: u64 = items.iter().map(|(k, v)| item_bytes(k, v)).sum();
        let replaced = items.get(key).map_or(0, |v| item_bytes(key, v));
        check_quota(self.quota, used, replaced, item_bytes(key, value))?;

        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(err) = self.write_through(&items) {
            match previous {
                Some(previous) => items.insert(key.to_string(), previous),
                None => items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items();
        if let Some(previous) = items.remove(key) {
            if let Err(err) = self.write_through(&items) {
                items.insert(key.to_string(), previous);
                return Err(err);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items().keys().cloned().collect())
    }

    fn used_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.items().iter().map(|(k, v)| item_bytes(k, v)).sum())
    }
}
