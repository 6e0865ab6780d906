use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::error::{CatalogError, Result};

/// Durable string key-value storage standing in for browser local storage.
///
/// Writes and removals take several keys at once so that related entries
/// land or disappear in a single operation.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_entries(&self, entries: &[(&str, &str)]) -> Result<()>;

    async fn remove_entries(&self, keys: &[&str]) -> Result<()>;
}

pub type SharedKeyValueStore = Arc<dyn KeyValueStore>;

/// JSON object on disk, rewritten atomically on every change
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| CatalogError::StateParse {
                    path: self.path_str(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(CatalogError::StateLoad {
                path: self.path_str(),
                source: e,
            }),
        }
    }

    /// Entries to start a write from. An unparseable file counts as empty so
    /// the write replaces it; the flag reports that it was discarded.
    async fn load_for_write(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.load().await {
            Ok(entries) => Ok((entries, false)),
            Err(CatalogError::StateParse { path, source }) => {
                warn!("Discarding unreadable state file {}: {}", path, source);
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries).map_err(|e| {
            CatalogError::StateParse {
                path: self.path_str(),
                source: e,
            }
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CatalogError::StateSave {
                    path: self.path_str(),
                    source: e,
                })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", self.path.display());
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| CatalogError::StateSave {
                path: self.path_str(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| CatalogError::StateSave {
                path: self.path_str(),
                source: e,
            })
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set_entries(&self, entries: &[(&str, &str)]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut current, _) = self.load_for_write().await?;
        for (key, value) in entries {
            current.insert(key.to_string(), value.to_string());
        }
        self.save(&current).await
    }

    async fn remove_entries(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut current, discarded) = self.load_for_write().await?;
        let before = current.len();
        current.retain(|k, _| !keys.contains(&k.as_str()));
        if current.len() == before && !discarded {
            return Ok(());
        }
        self.save(&current).await
    }
}

/// In-process store, used where nothing should touch the disk
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set_entries(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut current = self.entries.lock();
        for (key, value) in entries {
            current.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn remove_entries(&self, keys: &[&str]) -> Result<()> {
        self.entries
            .lock()
            .retain(|k, _| !keys.contains(&k.as_str()));
        Ok(())
    }
}
