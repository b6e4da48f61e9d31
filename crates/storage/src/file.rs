//! File-backed settings storage
//!
//! All keys live in a single JSON object on disk. Writes go to a temp file
//! that is synced and then renamed over the target, so a crash mid-write
//! leaves the previous file intact.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::settings::{Result, SettingsStorage, StorageError};

/// Settings storage persisted as one JSON file
pub struct FileSettingsStorage {
    path: PathBuf,
    /// Lazily loaded file contents
    entries: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileSettingsStorage {
    /// Create a storage for the given file path (the file need not exist)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), entries: Mutex::new(None) }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_atomic(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStorage for FileSettingsStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn save(&self, key: &str, blob: String) -> Result<()> {
        let mut guard = self.entries.lock().await;
        let mut entries = match guard.take() {
            Some(entries) => entries,
            None => self.read_file().await?,
        };
        entries.insert(key.to_string(), blob);

        let written = self.write_atomic(&entries).await;
        // Keep the in-memory view even if the disk write failed; the next
        // save rewrites the whole file.
        *guard = Some(entries);
        written
    }
}
