//! Storage collaborators for persisted client settings
//!
//! Settings stores never own a database; they hold a shared
//! [`SettingsStorage`] capability and exchange opaque JSON blobs with it.
//! Loading a key that was never saved yields `Ok(None)`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::kv::{KvError, KvStore};

/// Settings storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key-value backend error
    #[error("Key-value error: {0}")]
    Kv(#[from] KvError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for settings storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Capability used by settings stores to read and write persisted blobs
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SettingsStorage: Send + Sync {
    /// Load the blob stored under `key`, or `None` if nothing was saved
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Persist `blob` under `key`, replacing any previous value
    async fn save(&self, key: &str, blob: String) -> Result<()>;
}

/// Volatile storage, for tests and signed-out sessions
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySettingsStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if nothing was stored
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SettingsStorage for MemorySettingsStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, blob: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), blob);
        Ok(())
    }
}

/// Settings storage on top of the sled key-value store
///
/// Keys are placed under a scope (`settings` by default), so a store keyed
/// `theme:current` lands at `settings:theme:current`.
pub struct KvSettingsStorage {
    kv: Arc<KvStore>,
    scope: String,
}

impl KvSettingsStorage {
    /// Wrap a key-value store using the default `settings` scope
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self::with_scope(kv, "settings")
    }

    /// Wrap a key-value store using a custom scope
    pub fn with_scope(kv: Arc<KvStore>, scope: impl Into<String>) -> Self {
        Self { kv, scope: scope.into() }
    }

    fn full_key(&self, key: &str) -> Result<String> {
        Ok(self.kv.scoped_key(&[self.scope.as_str(), key])?)
    }
}

#[async_trait]
impl SettingsStorage for KvSettingsStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let key = self.full_key(key)?;
        let kv = Arc::clone(&self.kv);
        blocking(move || kv.get_raw(&key)).await
    }

    async fn save(&self, key: &str, blob: String) -> Result<()> {
        let key = self.full_key(key)?;
        let kv = Arc::clone(&self.kv);
        blocking(move || {
            kv.set_raw(&key, &blob)?;
            kv.flush()
        })
        .await
    }
}

/// Run a sled call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, KvError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Backend(format!("kv task failed: {}", e)))?
        .map_err(StorageError::from)
}
