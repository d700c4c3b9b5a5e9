//! Configuration loading for draftsafe.
//!
//! Reads `autosave.toml` from the data directory (`~/.draftsafe/` by
//! default) into [`AutoSaveConfig`]. Falls back to defaults when the file is
//! missing or malformed.

use std::path::{Path, PathBuf};

use draftsafe_types::config::AutoSaveConfig;
use draftsafe_types::error::ConfigError;

pub const CONFIG_FILE: &str = "autosave.toml";

/// Resolve the data directory.
///
/// Priority:
/// 1. `DRAFTSAFE_DATA_DIR` environment variable
/// 2. `~/.draftsafe`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DRAFTSAFE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".draftsafe");
    }
    PathBuf::from(".draftsafe")
}

/// Read and parse `{data_dir}/autosave.toml`, reporting every failure.
pub async fn read_autosave_config(data_dir: &Path) -> Result<AutoSaveConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
}

/// Load `{data_dir}/autosave.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or malformed file: a warning, then defaults.
pub async fn load_autosave_config(data_dir: &Path) -> AutoSaveConfig {
    let path = data_dir.join(CONFIG_FILE);
    match tokio::fs::try_exists(&path).await {
        Ok(false) => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", path.display());
            return AutoSaveConfig::default();
        }
        Ok(true) => {}
        Err(err) => {
            tracing::warn!("Failed to stat {}: {err}, using defaults", path.display());
            return AutoSaveConfig::default();
        }
    }

    match read_autosave_config(data_dir).await {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            AutoSaveConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_autosave_config(tmp.path()).await, AutoSaveConfig::default());
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
debounce_millis = 500
max_entries = 20

[storage_options]
compress = true
ttl_millis = 0
"#,
        )
        .await
        .unwrap();

        let config = load_autosave_config(tmp.path()).await;
        assert_eq!(config.debounce_millis, 500);
        assert_eq!(config.max_entries, 20);
        assert!(config.storage_options.compress);
        assert_eq!(config.storage_options.ttl_millis, Some(0));
    }

    #[tokio::test]
    async fn invalid_toml_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "debounce_millis = \"soon\"")
            .await
            .unwrap();

        assert_eq!(load_autosave_config(tmp.path()).await, AutoSaveConfig::default());
        assert!(matches!(
            read_autosave_config(tmp.path()).await,
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn read_reports_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            read_autosave_config(tmp.path()).await,
            Err(ConfigError::Read(_))
        ));
    }
}
