//! Application state wiring the auto-save stack for CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};

use draftsafe_infra::config::{load_autosave_config, resolve_data_dir};
use draftsafe_infra::crypto::KeySource;
use draftsafe_infra::stack::{AutoSaveStack, DefaultManager, StackBuilder, STORE_FILE};
use draftsafe_infra::storage::StorageAdapter;
use draftsafe_types::config::AutoSaveConfig;

pub struct AppState {
    pub stack: AutoSaveStack,
    pub config: AutoSaveConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load config from the data directory and open the store.
    pub async fn init(data_dir: Option<PathBuf>, key_source: Option<KeySource>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_autosave_config(&data_dir).await;
        let mut builder = StackBuilder::new(&data_dir).config(config.clone());
        if let Some(source) = key_source {
            builder = builder.key_source(source);
        }
        let stack = builder.build().with_context(|| {
            format!(
                "Failed to open auto-save store in {} (pass --keychain or --passphrase-env if it is encrypted)",
                data_dir.display()
            )
        })?;
        tracing::debug!(data_dir = %data_dir.display(), "auto-save store opened");

        Ok(Self {
            stack,
            config,
            data_dir,
        })
    }

    pub fn manager(&self) -> &DefaultManager {
        &self.stack.manager
    }

    pub fn storage(&self) -> &StorageAdapter {
        self.stack.manager.storage()
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }
}

/// Resolve key flags into a key source.
pub fn key_source_from_flags(passphrase_env: Option<&str>, keychain: bool) -> Result<Option<KeySource>> {
    if keychain {
        return Ok(Some(KeySource::Keychain));
    }
    match passphrase_env {
        Some(var) => {
            let passphrase = std::env::var(var)
                .with_context(|| format!("Environment variable {var} is not set"))?;
            Ok(Some(KeySource::passphrase(passphrase)))
        }
        None => Ok(None),
    }
}
