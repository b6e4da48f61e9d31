//! Persisted client settings
//!
//! [`SettingsStore`] keeps one setting (the theme, a language, a feed
//! preference) in memory as the source of truth and writes it through to a
//! [`SettingsStorage`] collaborator:
//!
//! - reads are synchronous and never wait for storage;
//! - hydration from storage is explicit, with a ready signal callers can await;
//! - writes are queued to a single background writer, in order, and each
//!   write hands back a [`PendingWrite`] that reports the outcome.
//!
//! Each store owns two keys in its namespace: `<namespace>:current` holds the
//! active value and `<namespace>:custom` the user-authored override.

use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use storage::{SettingsStorage, StorageError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// Key suffix of the active value
pub const CURRENT_KEY: &str = "current";

/// Key suffix of the user-authored override
pub const CUSTOM_KEY: &str = "custom";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Storage collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Value could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The background writer is gone
    #[error("Settings writer closed before the write completed")]
    WriterClosed,
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Values a [`SettingsStore`] can hold
pub trait SettingValue:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> SettingValue for T where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Settings store configuration
#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// Key namespace in storage
    pub namespace: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self { namespace: "settings".to_string() }
    }
}

impl SettingsConfig {
    /// Create a configuration for a namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    /// Storage key for a suffix
    pub fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.namespace, suffix)
    }
}

/// In-memory state of one setting
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsState<V> {
    /// Active value
    pub current: V,
    /// User-authored override, independent of `current`
    pub custom: Option<V>,
}

/// What hydration restored from storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hydration {
    /// A persisted active value was applied
    pub current_restored: bool,
    /// A persisted override was applied
    pub custom_restored: bool,
}

/// Outcome of queued persistence writes
///
/// Dropping it is fine: the write still happens, and failures are logged.
#[derive(Debug)]
#[must_use = "await `wait` to observe persistence failures, or drop to ignore them"]
pub struct PendingWrite {
    receivers: Vec<oneshot::Receiver<Result<()>>>,
}

impl PendingWrite {
    fn none() -> Self {
        Self { receivers: Vec::new() }
    }

    /// Whether nothing was queued (no storage bound)
    pub fn is_noop(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Wait until every queued write finished, returning the first failure
    pub async fn wait(self) -> Result<()> {
        let mut first_error = None;
        for rx in self.receivers {
            let result = rx.await.unwrap_or(Err(SettingsError::WriterClosed));
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct WriteJob {
    storage: Arc<dyn SettingsStorage>,
    key: String,
    blob: String,
    done: oneshot::Sender<Result<()>>,
}

struct Inner<V> {
    state: SettingsState<V>,
    /// Local write counters, used to keep hydration from clobbering newer values
    current_rev: u64,
    custom_rev: u64,
}

/// In-memory setting with write-through persistence
pub struct SettingsStore<V> {
    config: SettingsConfig,
    inner: RwLock<Inner<V>>,
    storage: RwLock<Option<Arc<dyn SettingsStorage>>>,
    writer: Mutex<Option<mpsc::UnboundedSender<WriteJob>>>,
    ready_tx: watch::Sender<bool>,
    current_tx: watch::Sender<V>,
}

impl<V: SettingValue> SettingsStore<V> {
    /// Create an unbound store seeded with `default`
    ///
    /// Reads return `default` until a storage is bound and hydrated.
    pub fn new(default: V) -> Self {
        Self::with_config(default, SettingsConfig::default())
    }

    /// Create an unbound store with a custom configuration
    pub fn with_config(default: V, config: SettingsConfig) -> Self {
        // Nothing to hydrate until a storage is bound
        let (ready_tx, _) = watch::channel(true);
        let (current_tx, _) = watch::channel(default.clone());
        Self {
            config,
            inner: RwLock::new(Inner {
                state: SettingsState { current: default, custom: None },
                current_rev: 0,
                custom_rev: 0,
            }),
            storage: RwLock::new(None),
            writer: Mutex::new(None),
            ready_tx,
            current_tx,
        }
    }

    /// Create a store bound to `storage` and start hydrating it in the background
    ///
    /// Must be called from within a Tokio runtime. Await
    /// [`ready`](Self::ready) to observe persisted values.
    pub fn spawn(default: V, storage: Arc<dyn SettingsStorage>, config: SettingsConfig) -> Arc<Self> {
        let store = Arc::new(Self::with_config(default, config));
        store.bind(Arc::clone(&storage));

        let task_store = Arc::clone(&store);
        tokio::spawn(async move {
            task_store.hydrate(storage).await;
        });
        store
    }

    /// Bind (or re-bind) `storage` and hydrate from it
    ///
    /// Persisted values replace the in-memory ones, except values written
    /// locally while hydration was running.
    pub async fn initialize(&self, storage: Arc<dyn SettingsStorage>) -> Hydration {
        self.bind(Arc::clone(&storage));
        self.hydrate(storage).await
    }

    /// Configuration
    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    /// Active value
    pub fn current(&self) -> V {
        self.inner.read().state.current.clone()
    }

    /// User-authored override, if any
    pub fn custom(&self) -> Option<V> {
        self.inner.read().state.custom.clone()
    }

    /// Whether a user-authored override exists
    pub fn has_custom(&self) -> bool {
        self.inner.read().state.custom.is_some()
    }

    /// Copy of the whole state
    pub fn state(&self) -> SettingsState<V> {
        self.inner.read().state.clone()
    }

    /// Whether a storage is bound
    pub fn is_bound(&self) -> bool {
        self.storage.read().is_some()
    }

    /// Whether hydration has completed
    ///
    /// An unbound store has nothing to hydrate and is ready.
    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Wait until hydration has completed
    pub async fn ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        // The sender lives as long as `self`, so this only returns once ready.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Subscribe to changes of the active value
    pub fn subscribe(&self) -> watch::Receiver<V> {
        self.current_tx.subscribe()
    }

    /// Make `value` active and queue it for persistence
    pub fn set(&self, value: V) -> PendingWrite {
        {
            let mut inner = self.inner.write();
            inner.state.current = value.clone();
            inner.current_rev += 1;
        }
        self.current_tx.send_replace(value.clone());

        let mut pending = PendingWrite::none();
        self.enqueue(&mut pending, CURRENT_KEY, &value);
        pending
    }

    /// Save `value` as the user-authored override, make it active, and queue both writes
    pub fn save_custom(&self, value: V) -> PendingWrite {
        {
            let mut inner = self.inner.write();
            inner.state.custom = Some(value.clone());
            inner.state.current = value.clone();
            inner.custom_rev += 1;
            inner.current_rev += 1;
        }
        self.current_tx.send_replace(value.clone());

        let mut pending = PendingWrite::none();
        self.enqueue(&mut pending, CUSTOM_KEY, &value);
        self.enqueue(&mut pending, CURRENT_KEY, &value);
        pending
    }

    fn bind(&self, storage: Arc<dyn SettingsStorage>) {
        *self.storage.write() = Some(storage);
        self.ready_tx.send_replace(false);

        let mut writer = self.writer.lock();
        if writer.as_ref().map_or(true, |tx| tx.is_closed()) {
            *writer = Some(spawn_writer(self.config.namespace.clone()));
        }
    }

    async fn hydrate(&self, storage: Arc<dyn SettingsStorage>) -> Hydration {
        let (current_rev, custom_rev) = {
            let inner = self.inner.read();
            (inner.current_rev, inner.custom_rev)
        };

        let current = self.load_value(storage.as_ref(), CURRENT_KEY).await;
        let custom = self.load_value(storage.as_ref(), CUSTOM_KEY).await;

        let mut hydration = Hydration::default();
        let published = {
            let mut inner = self.inner.write();
            if let Some(value) = custom {
                if inner.custom_rev == custom_rev {
                    inner.state.custom = Some(value);
                    hydration.custom_restored = true;
                } else {
                    tracing::debug!(namespace = %self.config.namespace, "kept custom value written during hydration");
                }
            }
            if let Some(value) = current {
                if inner.current_rev == current_rev {
                    inner.state.current = value;
                    hydration.current_restored = true;
                } else {
                    tracing::debug!(namespace = %self.config.namespace, "kept current value written during hydration");
                }
            }
            inner.state.current.clone()
        };

        self.current_tx.send_if_modified(|current| {
            if *current != published {
                *current = published;
                true
            } else {
                false
            }
        });
        self.ready_tx.send_replace(true);
        tracing::debug!(
            namespace = %self.config.namespace,
            current_restored = hydration.current_restored,
            custom_restored = hydration.custom_restored,
            "settings hydrated"
        );
        hydration
    }

    async fn load_value(&self, storage: &dyn SettingsStorage, suffix: &str) -> Option<V> {
        let key = self.config.key(suffix);
        match storage.load(&key).await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(%key, %error, "ignoring unreadable persisted setting");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(%key, %error, "failed to load persisted setting");
                None
            }
        }
    }

    fn enqueue(&self, pending: &mut PendingWrite, suffix: &str, value: &V) {
        let Some(storage) = self.storage.read().clone() else {
            return;
        };
        let key = self.config.key(suffix);
        let (done, rx) = oneshot::channel();
        pending.receivers.push(rx);

        let blob = match serde_json::to_string(value) {
            Ok(blob) => blob,
            Err(error) => {
                tracing::warn!(%key, %error, "failed to serialize setting");
                let _ = done.send(Err(SettingsError::Serialization(error)));
                return;
            }
        };

        let writer = self.writer.lock();
        let sent = match writer.as_ref() {
            Some(tx) => tx.send(WriteJob { storage, key, blob, done }).map_err(|e| e.0),
            None => Err(WriteJob { storage, key, blob, done }),
        };
        if let Err(job) = sent {
            tracing::error!(key = %job.key, "settings writer unavailable, dropping write");
            let _ = job.done.send(Err(SettingsError::WriterClosed));
        }
    }
}

fn spawn_writer(namespace: String) -> mpsc::UnboundedSender<WriteJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let result = job.storage.save(&job.key, job.blob).await.map_err(SettingsError::from);
            if let Err(error) = &result {
                tracing::warn!(%namespace, key = %job.key, %error, "failed to persist setting");
            }
            let _ = job.done.send(result);
        }
        tracing::debug!(%namespace, "settings writer stopped");
    });
    tx
}
