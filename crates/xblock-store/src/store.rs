//! Key-value storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::StoreError;

const CHANGE_CAPACITY: usize = 64;

/// A key changed. `new_value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub new_value: Option<Value>,
}

/// JSON key-value storage with change notification.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

fn notify(tx: &broadcast::Sender<StoreChange>, key: &str, new_value: Option<Value>) {
    // No subscribers is not an error.
    let _ = tx.send(StoreChange {
        key: key.to_string(),
        new_value,
    });
}

/// In-memory store.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            entries: RwLock::new(BTreeMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.clone());
        notify(&self.changes, key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.entries.write().await.remove(key).is_some() {
            notify(&self.changes, key, None);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let removed = std::mem::take(&mut *self.entries.write().await);
        for key in removed.keys() {
            notify(&self.changes, key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

/// Store persisted as a single JSON object.
///
/// The whole object is rewritten on every change through a temporary file
/// and a rename, so a crash never leaves a truncated store behind. The
/// in-memory view only changes once the write has landed.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store. An unreadable object is logged and
    /// treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let entries: BTreeMap<String, Value> = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring unreadable store {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("FileStore opened at {:?} with {} keys", path, entries.len());

        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let mut staged = entries.clone();
        staged.insert(key.to_string(), value.clone());
        self.persist(&staged).await?;
        *entries = staged;
        drop(entries);
        notify(&self.changes, key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut staged = entries.clone();
        staged.remove(key);
        self.persist(&staged).await?;
        *entries = staged;
        drop(entries);
        notify(&self.changes, key, None);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        self.persist(&BTreeMap::new()).await?;
        let removed = std::mem::take(&mut *entries);
        drop(entries);
        for key in removed.keys() {
            notify(&self.changes, key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
