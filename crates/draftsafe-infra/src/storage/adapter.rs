//! `AutoSaveStorage` over a pair of raw areas.
//!
//! Values are wrapped in an [`Envelope`] before they reach the area. Every
//! managed key carries the adapter's prefix; keys without it belong to other
//! writers and are never listed, counted, exported, or removed.
//!
//! Size handling:
//! - A value whose area write fails with `QuotaExceeded` triggers eviction
//!   of the oldest-written managed keys and one retry. A second failure is
//!   reported as `Unavailable`.
//! - After a successful write, managed bytes in the area above
//!   `max_bytes` are trimmed the same way.
//!
//! Unreadable values (bad envelope, checksum mismatch, failed decrypt or
//! inflate) are removed on read and logged by key only. Encrypted values
//! read without a configured key are left in place and reported as
//! `StorageError::Decode`.

use std::collections::BTreeMap;
use std::sync::Arc;

use draftsafe_core::clock::{Clock, SystemClock};
use draftsafe_core::storage::AutoSaveStorage;
use draftsafe_types::config::{DEFAULT_MAX_STORAGE_BYTES, StorageOptions};
use draftsafe_types::error::StorageError;
use draftsafe_types::storage::{EXPORT_VERSION, StorageExport};

use super::area::{StorageArea, item_bytes};
use super::envelope::{Envelope, EnvelopeError};
use super::memory::MemoryArea;
use crate::crypto::EntryCipher;

pub const DEFAULT_KEY_PREFIX: &str = "draftsafe:";

pub struct StorageAdapter {
    session: Arc<dyn StorageArea>,
    persistent: Arc<dyn StorageArea>,
    cipher: Option<Arc<EntryCipher>>,
    clock: Arc<dyn Clock>,
    prefix: String,
    max_bytes: u64,
}

impl std::fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("prefix", &self.prefix)
            .field("max_bytes", &self.max_bytes)
            .field("encryption", &self.cipher.is_some())
            .finish()
    }
}

impl StorageAdapter {
    pub fn new(session: Arc<dyn StorageArea>, persistent: Arc<dyn StorageArea>) -> Self {
        Self {
            session,
            persistent,
            cipher: None,
            clock: Arc::new(SystemClock),
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_bytes: DEFAULT_MAX_STORAGE_BYTES,
        }
    }

    /// Both areas in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryArea::new()), Arc::new(MemoryArea::new()))
    }

    pub fn with_cipher(mut self, cipher: EntryCipher) -> Self {
        self.cipher = Some(Arc::new(cipher));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Managed-bytes budget per area. 0 disables the budget.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn has_cipher(&self) -> bool {
        self.cipher.is_some()
    }

    fn area(&self, options: &StorageOptions) -> &dyn StorageArea {
        if options.persistent {
            self.persistent.as_ref()
        } else {
            self.session.as_ref()
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn managed_keys(&self, area: &dyn StorageArea) -> Result<Vec<String>, StorageError> {
        Ok(area
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect())
    }

    fn managed_bytes(&self, area: &dyn StorageArea) -> Result<u64, StorageError> {
        let mut total = 0;
        for key in self.managed_keys(area)? {
            if let Some(raw) = area.get_item(&key)? {
                total += item_bytes(&key, &raw);
            }
        }
        Ok(total)
    }

    fn discard(&self, area: &dyn StorageArea, full_key: &str, err: &EnvelopeError) {
        tracing::warn!(key = %full_key, error = %err, "discarding undecodable stored value");
        if let Err(e) = area.remove_item(full_key) {
            tracing::debug!(key = %full_key, error = %e, "failed to remove undecodable value");
        }
    }

    /// Envelope and raw text of a managed key. Missing, undecodable, and
    /// expired values yield `None`; the last two are removed.
    fn live_envelope(
        &self,
        area: &dyn StorageArea,
        full_key: &str,
    ) -> Result<Option<(Envelope, String)>, StorageError> {
        let Some(raw) = area.get_item(full_key)? else {
            return Ok(None);
        };
        let envelope = match Envelope::parse(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.discard(area, full_key, &err);
                return Ok(None);
            }
        };
        if envelope.is_expired_at(self.now_millis()) {
            tracing::debug!(key = %full_key, "removing expired value");
            area.remove_item(full_key)?;
            return Ok(None);
        }
        Ok(Some((envelope, raw)))
    }

    /// Remove the oldest-written managed keys other than `keep` until at
    /// least `to_free` bytes are released. Returns the bytes released.
    fn evict_oldest(
        &self,
        area: &dyn StorageArea,
        keep: &str,
        to_free: u64,
    ) -> Result<u64, StorageError> {
        let mut candidates: Vec<(i64, String, u64)> = Vec::new();
        for key in self.managed_keys(area)? {
            if key == keep {
                continue;
            }
            if let Some(raw) = area.get_item(&key)? {
                let at = Envelope::parse(&raw).map_or(i64::MIN, |e| e.at);
                let size = item_bytes(&key, &raw);
                candidates.push((at, key, size));
            }
        }
        candidates.sort();

        let mut freed = 0;
        for (_, key, size) in candidates {
            if freed >= to_free {
                break;
            }
            area.remove_item(&key)?;
            freed += size;
            tracing::debug!(key = %key, bytes = size, "evicted oldest value to free space");
        }
        Ok(freed)
    }

    fn write(&self, area: &dyn StorageArea, full_key: &str, raw: &str) -> Result<(), StorageError> {
        match area.set_item(full_key, raw) {
            Ok(()) => Ok(()),
            Err(StorageError::QuotaExceeded { needed, available }) => {
                let to_free = needed.saturating_sub(available).max(1);
                self.evict_oldest(area, full_key, to_free)
                    .map_err(|e| StorageError::Unavailable(e.to_string()))?;
                area.set_item(full_key, raw).map_err(|e| {
                    StorageError::Unavailable(format!("write failed after eviction: {e}"))
                })
            }
            Err(e) => Err(e),
        }
    }

    fn enforce_budget(&self, area: &dyn StorageArea, keep: &str) -> Result<(), StorageError> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        let used = self.managed_bytes(area)?;
        if used > self.max_bytes {
            let freed = self.evict_oldest(area, keep, used - self.max_bytes)?;
            tracing::debug!(used, freed, budget = self.max_bytes, "storage budget enforced");
        }
        Ok(())
    }

    /// Number of managed keys in the area, readable or not.
    pub fn managed_len(&self, options: &StorageOptions) -> Result<usize, StorageError> {
        Ok(self.managed_keys(self.area(options))?.len())
    }

    /// Read every managed key once, removing expired and unreadable values.
    ///
    /// Returns how many keys were removed. Encrypted values are only
    /// checked when a key is configured.
    pub fn purge(&self, options: &StorageOptions) -> Result<usize, StorageError> {
        let area = self.area(options);
        let before = self.managed_keys(area)?.len();
        for full_key in self.managed_keys(area)? {
            let Some((envelope, _)) = self.live_envelope(area, &full_key)? else {
                continue;
            };
            match envelope.open(self.cipher.as_deref()) {
                Ok(_) | Err(EnvelopeError::MissingKey) => {}
                Err(err) => self.discard(area, &full_key, &err),
            }
        }
        let removed = before.saturating_sub(self.managed_keys(area)?.len());
        tracing::info!(removed, persistent = options.persistent, "storage purged");
        Ok(removed)
    }

    fn export_area(
        &self,
        area: &dyn StorageArea,
    ) -> Result<BTreeMap<String, String>, StorageError> {
        let mut out = BTreeMap::new();
        for full_key in self.managed_keys(area)? {
            if let Some((_, raw)) = self.live_envelope(area, &full_key)? {
                let key = full_key[self.prefix.len()..].to_string();
                out.insert(key, raw);
            }
        }
        Ok(out)
    }

    fn import_area(
        &self,
        area: &dyn StorageArea,
        values: &BTreeMap<String, String>,
    ) -> Result<usize, StorageError> {
        let now = self.now_millis();
        let mut imported = 0;
        for (key, raw) in values {
            match Envelope::parse(raw) {
                Ok(envelope) if envelope.is_expired_at(now) => {
                    tracing::debug!(key = %key, "skipping expired value on import");
                }
                Ok(_) => {
                    let full_key = self.full_key(key);
                    self.write(area, &full_key, raw)?;
                    imported += 1;
                }
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "skipping undecodable value on import");
                }
            }
        }
        Ok(imported)
    }
}

impl AutoSaveStorage for StorageAdapter {
    async fn set(
        &self,
        key: &str,
        value: &str,
        options: &StorageOptions,
    ) -> Result<(), StorageError> {
        let cipher = if options.encrypt {
            Some(self.cipher.as_deref().ok_or_else(|| {
                StorageError::Unavailable("encryption requested but no key is configured".into())
            })?)
        } else {
            None
        };

        let at = self.now_millis();
        let exp = options
            .ttl_millis
            .filter(|ttl| *ttl > 0)
            .map(|ttl| at.saturating_add(ttl as i64));
        let raw = Envelope::seal(value, options.compress, cipher, at, exp)
            .and_then(|envelope| envelope.to_json())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let area = self.area(options);
        let full_key = self.full_key(key);
        let size = item_bytes(&full_key, &raw);
        if self.max_bytes > 0 && size > self.max_bytes {
            return Err(StorageError::QuotaExceeded {
                needed: size,
                available: self.max_bytes,
            });
        }

        self.write(area, &full_key, &raw)?;
        self.enforce_budget(area, &full_key)?;
        tracing::trace!(key = %full_key, bytes = size, "value stored");
        Ok(())
    }

    async fn get(&self, key: &str, options: &StorageOptions) -> Result<Option<String>, StorageError> {
        let area = self.area(options);
        let full_key = self.full_key(key);
        let Some((envelope, _)) = self.live_envelope(area, &full_key)? else {
            return Ok(None);
        };
        match envelope.open(self.cipher.as_deref()) {
            Ok(value) => Ok(Some(value)),
            Err(err @ EnvelopeError::MissingKey) => Err(StorageError::Decode {
                key: full_key,
                reason: err.to_string(),
            }),
            Err(err) => {
                self.discard(area, &full_key, &err);
                Ok(None)
            }
        }
    }

    async fn remove(&self, key: &str, options: &StorageOptions) -> Result<(), StorageError> {
        self.area(options).remove_item(&self.full_key(key))
    }

    async fn has(&self, key: &str, options: &StorageOptions) -> Result<bool, StorageError> {
        let area = self.area(options);
        Ok(self.live_envelope(area, &self.full_key(key))?.is_some())
    }

    async fn keys(&self, options: &StorageOptions) -> Result<Vec<String>, StorageError> {
        let area = self.area(options);
        let mut keys = Vec::new();
        for full_key in self.managed_keys(area)? {
            if self.live_envelope(area, &full_key)?.is_some() {
                keys.push(full_key[self.prefix.len()..].to_string());
            }
        }
        Ok(keys)
    }

    async fn clear(&self, options: &StorageOptions) -> Result<(), StorageError> {
        let area = self.area(options);
        let keys = self.managed_keys(area)?;
        for key in &keys {
            area.remove_item(key)?;
        }
        tracing::debug!(count = keys.len(), persistent = options.persistent, "storage area cleared");
        Ok(())
    }

    async fn export_data(&self) -> Result<String, StorageError> {
        let mut export = StorageExport::new(self.clock.now());
        export.session = self.export_area(self.session.as_ref())?;
        export.persistent = self.export_area(self.persistent.as_ref())?;
        serde_json::to_string_pretty(&export).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn import_data(&self, blob: &str) -> Result<usize, StorageError> {
        let export: StorageExport =
            serde_json::from_str(blob).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if export.version != EXPORT_VERSION {
            return Err(StorageError::Serialization(format!(
                "unsupported export version {}",
                export.version
            )));
        }
        let imported = self.import_area(self.session.as_ref(), &export.session)?
            + self.import_area(self.persistent.as_ref(), &export.persistent)?;
        tracing::info!(imported, total = export.len(), "storage import complete");
        Ok(imported)
    }

    async fn storage_size(&self) -> Result<u64, StorageError> {
        Ok(self.managed_bytes(self.session.as_ref())?
            + self.managed_bytes(self.persistent.as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use draftsafe_core::clock::ManualClock;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn opts() -> StorageOptions {
        StorageOptions {
            ttl_millis: None,
            ..StorageOptions::default()
        }
    }

    fn adapter_over(persistent: Arc<MemoryArea>, clock: Arc<ManualClock>) -> StorageAdapter {
        StorageAdapter::new(Arc::new(MemoryArea::new()), persistent).with_clock(clock)
    }

    /// Bytes one `kN`/`aaaa` value occupies in an area.
    async fn item_size() -> u64 {
        let area = Arc::new(MemoryArea::new());
        let adapter = adapter_over(Arc::clone(&area), clock());
        adapter.set("k0", "aaaa", &opts()).await.unwrap();
        area.used_bytes().unwrap()
    }

    #[tokio::test]
    async fn values_are_enveloped_under_prefix() {
        let area = Arc::new(MemoryArea::new());
        let adapter = adapter_over(Arc::clone(&area), clock());
        adapter.set("autosave.notes", "draft", &opts()).await.unwrap();

        let raw = area.get_item("draftsafe:autosave.notes").unwrap().unwrap();
        let envelope = Envelope::parse(&raw).unwrap();
        assert!(!envelope.gz && !envelope.enc);
        assert_eq!(
            adapter.get("autosave.notes", &opts()).await.unwrap().as_deref(),
            Some("draft")
        );
        assert!(adapter.has("autosave.notes", &opts()).await.unwrap());
        assert_eq!(adapter.keys(&opts()).await.unwrap(), vec!["autosave.notes".to_string()]);
    }

    #[tokio::test]
    async fn foreign_keys_are_left_alone() {
        let area = Arc::new(MemoryArea::new());
        area.set_item("theme", "dark").unwrap();
        let adapter = adapter_over(Arc::clone(&area), clock());
        adapter.set("a", "1", &opts()).await.unwrap();

        assert_eq!(adapter.keys(&opts()).await.unwrap(), vec!["a".to_string()]);
        let managed = area.used_bytes().unwrap() - item_bytes("theme", "dark");
        assert_eq!(adapter.storage_size().await.unwrap(), managed);

        adapter.clear(&opts()).await.unwrap();
        assert!(adapter.keys(&opts()).await.unwrap().is_empty());
        assert_eq!(area.get_item("theme").unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn session_and_persistent_are_separate() {
        let adapter = StorageAdapter::in_memory();
        adapter.set("k", "durable", &opts()).await.unwrap();
        adapter.set("k", "tab-only", &StorageOptions::session()).await.unwrap();

        assert_eq!(adapter.get("k", &opts()).await.unwrap().as_deref(), Some("durable"));
        assert_eq!(
            adapter.get("k", &StorageOptions::session()).await.unwrap().as_deref(),
            Some("tab-only")
        );
        adapter.clear(&StorageOptions::session()).await.unwrap();
        assert!(adapter.has("k", &opts()).await.unwrap());
    }

    #[tokio::test]
    async fn ttl_expires_strictly_after_deadline() {
        let area = Arc::new(MemoryArea::new());
        let clock = clock();
        let adapter = adapter_over(Arc::clone(&area), Arc::clone(&clock));
        let options = StorageOptions {
            ttl_millis: Some(1_000),
            ..StorageOptions::default()
        };
        adapter.set("k", "v", &options).await.unwrap();

        clock.advance(Duration::milliseconds(1_000));
        assert_eq!(adapter.get("k", &options).await.unwrap().as_deref(), Some("v"));

        clock.advance(Duration::milliseconds(1));
        assert!(adapter.get("k", &options).await.unwrap().is_none());
        assert!(area.get_item("draftsafe:k").unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_ttl_means_no_expiry() {
        let clock = clock();
        let adapter = adapter_over(Arc::new(MemoryArea::new()), Arc::clone(&clock));
        let options = StorageOptions {
            ttl_millis: Some(0),
            ..StorageOptions::default()
        };
        adapter.set("k", "v", &options).await.unwrap();
        clock.advance(Duration::days(365));
        assert!(adapter.has("k", &options).await.unwrap());
    }

    #[tokio::test]
    async fn large_values_are_compressed_when_requested() {
        let area = Arc::new(MemoryArea::new());
        let adapter = adapter_over(Arc::clone(&area), clock());
        let text = "Monday: rest. Tuesday: intervals. ".repeat(100);
        let options = StorageOptions {
            compress: true,
            ..opts()
        };
        adapter.set("big", &text, &options).await.unwrap();

        let raw = area.get_item("draftsafe:big").unwrap().unwrap();
        assert!(Envelope::parse(&raw).unwrap().gz);
        assert!(raw.len() < text.len());
        // Reading does not depend on the caller's options.
        assert_eq!(adapter.get("big", &opts()).await.unwrap(), Some(text));
    }

    #[tokio::test]
    async fn encrypted_values_roundtrip_and_hide_content() {
        let area = Arc::new(MemoryArea::new());
        let adapter =
            adapter_over(Arc::clone(&area), clock()).with_cipher(EntryCipher::new(&[5; 32]));
        let options = StorageOptions {
            encrypt: true,
            compress: true,
            ..opts()
        };
        adapter.set("k", "client injury notes", &options).await.unwrap();

        let raw = area.get_item("draftsafe:k").unwrap().unwrap();
        assert!(!raw.contains("injury"));
        assert_eq!(
            adapter.get("k", &opts()).await.unwrap().as_deref(),
            Some("client injury notes")
        );
    }

    #[tokio::test]
    async fn encryption_without_key_is_refused() {
        let adapter = StorageAdapter::in_memory();
        let options = StorageOptions {
            encrypt: true,
            ..opts()
        };
        assert!(matches!(
            adapter.set("k", "v", &options).await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn encrypted_value_read_without_key_is_kept() {
        let area = Arc::new(MemoryArea::new());
        let writer =
            adapter_over(Arc::clone(&area), clock()).with_cipher(EntryCipher::new(&[5; 32]));
        let options = StorageOptions {
            encrypt: true,
            ..opts()
        };
        writer.set("k", "v", &options).await.unwrap();

        let reader = adapter_over(Arc::clone(&area), clock());
        assert!(matches!(
            reader.get("k", &opts()).await,
            Err(StorageError::Decode { .. })
        ));
        assert!(area.get_item("draftsafe:k").unwrap().is_some());
    }

    #[tokio::test]
    async fn undecodable_values_are_discarded() {
        let area = Arc::new(MemoryArea::new());
        area.set_item("draftsafe:garbage", "{{{").unwrap();
        let adapter = adapter_over(Arc::clone(&area), clock());
        adapter.set("good", "v", &opts()).await.unwrap();

        let mut envelope =
            Envelope::parse(&area.get_item("draftsafe:good").unwrap().unwrap()).unwrap();
        envelope.data = "flipped".to_string();
        area.set_item("draftsafe:tampered", &envelope.to_json().unwrap()).unwrap();

        assert!(adapter.get("garbage", &opts()).await.unwrap().is_none());
        assert!(adapter.get("tampered", &opts()).await.unwrap().is_none());
        assert!(area.get_item("draftsafe:garbage").unwrap().is_none());
        assert!(area.get_item("draftsafe:tampered").unwrap().is_none());
        assert_eq!(adapter.keys(&opts()).await.unwrap(), vec!["good".to_string()]);
    }

    #[tokio::test]
    async fn quota_failure_evicts_oldest_and_retries() {
        let size = item_size().await;
        let area = Arc::new(MemoryArea::with_quota(2 * size + size / 2));
        let clock = clock();
        let adapter = adapter_over(Arc::clone(&area), Arc::clone(&clock));

        for key in ["k1", "k2", "k3"] {
            adapter.set(key, "aaaa", &opts()).await.unwrap();
            clock.advance(Duration::seconds(1));
        }
        let mut keys = adapter.keys(&opts()).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["k2".to_string(), "k3".to_string()]);
    }

    #[tokio::test]
    async fn quota_failure_after_eviction_is_unavailable() {
        let size = item_size().await;
        let area = Arc::new(MemoryArea::with_quota(size));
        let adapter = adapter_over(Arc::clone(&area), clock());
        assert!(matches!(
            adapter.set("k1", &"a".repeat(64), &opts()).await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn budget_trims_oldest_written() {
        let size = item_size().await;
        let area = Arc::new(MemoryArea::new());
        let clock = clock();
        let adapter =
            adapter_over(Arc::clone(&area), Arc::clone(&clock)).with_max_bytes(2 * size + size / 2);

        for key in ["k1", "k2", "k3"] {
            adapter.set(key, "aaaa", &opts()).await.unwrap();
            clock.advance(Duration::seconds(1));
        }
        let mut keys = adapter.keys(&opts()).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["k2".to_string(), "k3".to_string()]);
        assert!(adapter.storage_size().await.unwrap() <= 2 * size + size / 2);
    }

    #[tokio::test]
    async fn value_larger_than_budget_is_rejected() {
        let adapter = StorageAdapter::in_memory().with_max_bytes(64);
        let err = adapter.set("k", &"a".repeat(200), &opts()).await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn export_import_moves_raw_envelopes() {
        let source = StorageAdapter::in_memory().with_cipher(EntryCipher::new(&[1; 32]));
        source.set("a", "plain", &opts()).await.unwrap();
        source
            .set("b", "sealed", &StorageOptions { encrypt: true, ..opts() })
            .await
            .unwrap();
        source.set("c", "tab", &StorageOptions::session()).await.unwrap();

        let blob = source.export_data().await.unwrap();
        assert!(!blob.contains("sealed"));

        let target = StorageAdapter::in_memory().with_cipher(EntryCipher::new(&[1; 32]));
        assert_eq!(target.import_data(&blob).await.unwrap(), 3);
        assert_eq!(target.get("b", &opts()).await.unwrap().as_deref(), Some("sealed"));
        assert_eq!(
            target.get("c", &StorageOptions::session()).await.unwrap().as_deref(),
            Some("tab")
        );
    }

    #[tokio::test]
    async fn import_rejects_unknown_version() {
        let adapter = StorageAdapter::in_memory();
        let blob = r#"{"version":99,"exported_at":"2026-03-01T09:00:00Z"}"#;
        assert!(matches!(
            adapter.import_data(blob).await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn purge_removes_expired_and_unreadable_values() {
        let area = Arc::new(MemoryArea::new());
        area.set_item("draftsafe:broken", "{{{").unwrap();
        area.set_item("unrelated", "{{{").unwrap();
        let clock = clock();
        let adapter = adapter_over(Arc::clone(&area), Arc::clone(&clock));
        adapter.set("keep", "v", &opts()).await.unwrap();
        adapter
            .set("short", "v", &StorageOptions { ttl_millis: Some(10), ..opts() })
            .await
            .unwrap();
        clock.advance(Duration::seconds(1));

        assert_eq!(adapter.managed_len(&opts()).unwrap(), 3);
        assert_eq!(adapter.purge(&opts()).unwrap(), 2);
        assert_eq!(adapter.managed_len(&opts()).unwrap(), 1);
        assert!(area.get_item("unrelated").unwrap().is_some());
    }

    #[tokio::test]
    async fn unavailable_session_area_surfaces_errors() {
        let session = Arc::new(MemoryArea::new());
        let adapter = StorageAdapter::new(Arc::clone(&session) as Arc<dyn StorageArea>, Arc::new(MemoryArea::new()));
        session.set_unavailable(true);
        assert!(matches!(
            adapter.set("k", "v", &StorageOptions::session()).await,
            Err(StorageError::Unavailable(_))
        ));
        adapter.set("k", "v", &opts()).await.unwrap();
    }

    #[tokio::test]
    async fn full_entry_survives_every_option_set() {
        use draftsafe_core::codec::{decode_entry, encode_entry};
        use draftsafe_types::entry::{AutoSaveEntry, EntryMetadata, FieldKind};

        let created = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let entry = AutoSaveEntry {
            id: "intake-notes".to_string(),
            content: "<p>Left hamstring tight \u{2014} 3\u{d7}8 Nordic curls</p>\n".repeat(40),
            path: "/clients/12/intake".to_string(),
            created_at: created,
            updated_at: created + Duration::minutes(12),
            expires_at: Some(created + Duration::days(7)),
            metadata: EntryMetadata {
                field_kind: Some(FieldKind::ContentEditable),
                form_name: Some("intake".to_string()),
                label: Some("Injury notes".to_string()),
            },
        };
        let encoded = encode_entry(&entry).unwrap();
        assert!(encoded.len() > 1024);

        let option_sets = [
            opts(),
            StorageOptions {
                compress: true,
                ..opts()
            },
            StorageOptions {
                encrypt: true,
                ..opts()
            },
            StorageOptions {
                compress: true,
                encrypt: true,
                ..opts()
            },
        ];
        for options in option_sets {
            let area = Arc::new(MemoryArea::new());
            let adapter = adapter_over(Arc::clone(&area), clock())
                .with_cipher(EntryCipher::new(&[5; 32]));
            adapter.set("autosave.intake-notes", &encoded, &options).await.unwrap();

            let raw = area.get_item("draftsafe:autosave.intake-notes").unwrap().unwrap();
            let envelope = Envelope::parse(&raw).unwrap();
            assert_eq!(envelope.gz, options.compress);
            assert_eq!(envelope.enc, options.encrypt);

            let stored = adapter
                .get("autosave.intake-notes", &options)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(decode_entry(&stored).unwrap(), entry);
        }
    }
}
