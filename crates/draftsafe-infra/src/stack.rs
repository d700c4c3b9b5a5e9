//! Wiring of the default stack: file-backed persistent area, in-memory
//! session area, `StorageAdapter`, manager, and recovery coordinator.

use std::path::PathBuf;
use std::sync::Arc;

use draftsafe_core::clock::{Clock, SystemClock};
use draftsafe_core::manager::AutoSaveManager;
use draftsafe_core::recovery::RecoveryCoordinator;
use draftsafe_types::config::AutoSaveConfig;
use draftsafe_types::error::StorageError;

use crate::crypto::{CipherError, KeySource};
use crate::storage::{FileArea, MemoryArea, StorageAdapter};

/// Persistent area file inside the data directory.
pub const STORE_FILE: &str = "autosave-store.json";

pub type DefaultManager = AutoSaveManager<StorageAdapter>;
pub type DefaultCoordinator = RecoveryCoordinator<StorageAdapter>;

#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("failed to open store: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to load encryption key: {0}")]
    Cipher(#[from] CipherError),

    #[error("encryption is enabled but no key source was given")]
    MissingKey,
}

/// A manager and the recovery coordinator sharing it.
#[derive(Clone)]
pub struct AutoSaveStack {
    pub manager: DefaultManager,
    pub recovery: Arc<DefaultCoordinator>,
}

pub struct StackBuilder {
    data_dir: PathBuf,
    config: AutoSaveConfig,
    key_source: Option<KeySource>,
    clock: Arc<dyn Clock>,
}

impl StackBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            config: AutoSaveConfig::default(),
            key_source: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: AutoSaveConfig) -> Self {
        self.config = config;
        self
    }

    /// Key material for encrypting and reading encrypted entries. Without
    /// one, encrypted entries stay in storage but cannot be read.
    pub fn key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = Some(key_source);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    /// Build only the storage adapter.
    pub fn build_storage(self) -> Result<StorageAdapter, StackError> {
        if self.config.storage_options.encrypt && self.key_source.is_none() {
            return Err(StackError::MissingKey);
        }

        let persistent = FileArea::open(self.store_path())?;
        let mut adapter = StorageAdapter::new(Arc::new(MemoryArea::new()), Arc::new(persistent))
            .with_clock(Arc::clone(&self.clock))
            .with_max_bytes(self.config.max_storage_bytes);
        if let Some(source) = self.key_source {
            adapter = adapter.with_cipher(source.into_cipher()?);
        }
        Ok(adapter)
    }

    pub fn build(self) -> Result<AutoSaveStack, StackError> {
        let config = self.config.clone();
        let clock = Arc::clone(&self.clock);
        let adapter = self.build_storage()?;

        tracing::debug!(
            namespace = %config.storage_key,
            encryption = adapter.has_cipher(),
            "auto-save stack built"
        );
        let manager = AutoSaveManager::with_clock(adapter, config, clock);
        let recovery = Arc::new(RecoveryCoordinator::new(manager.clone()));
        Ok(AutoSaveStack { manager, recovery })
    }
}
