//! Bounded search history persisted to a key-value store.
//!
//! The log keeps the most recent queries first and is written back in full on
//! every change. Storage problems never reach the caller: a missing or corrupt
//! value loads as an empty log, and failed writes are only logged.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Key under which the log is stored
pub const HISTORY_KEY: &str = "researchSearchHistory";

/// Default number of entries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// A single history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Query as submitted
    pub query: String,
    /// ISO-8601 timestamp (UTC)
    pub timestamp: String,
}

impl HistoryEntry {
    /// Entry stamped with the current time
    pub fn now(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Storage errors; only ever logged
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// External string key-value storage
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Store keeping one `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the platform config directory
    pub fn default_location() -> Self {
        let dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(env!("CARGO_PKG_NAME"));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(locked(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        locked(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        locked(&self.values).remove(key);
        Ok(())
    }
}

/// Most-recent-first log of submitted queries
#[derive(Debug)]
pub struct SearchHistory {
    store: Arc<dyn KeyValueStore>,
    entries: Mutex<Vec<HistoryEntry>>,
    capacity: usize,
}

impl SearchHistory {
    /// Read the persisted log; missing or unreadable data yields an empty log
    pub fn load(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let mut entries = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<HistoryEntry>>(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt search history: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read search history: {}", e);
                Vec::new()
            }
        };
        entries.truncate(capacity);

        Self {
            store,
            entries: Mutex::new(entries),
            capacity,
        }
    }

    /// Empty log that is never written anywhere
    pub fn in_memory(capacity: usize) -> Self {
        Self::load(Arc::new(MemoryStore::new()), capacity)
    }

    /// Prepend `query` and persist the log
    pub fn record(&self, query: &str) {
        let snapshot = {
            let mut entries = locked(&self.entries);
            entries.insert(0, HistoryEntry::now(query));
            entries.truncate(self.capacity);
            entries.clone()
        };
        self.persist(&snapshot);
    }

    /// Entries, most recent first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        locked(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        locked(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, including the persisted copy
    pub fn clear(&self) {
        locked(&self.entries).clear();
        if let Err(e) = self.store.remove(HISTORY_KEY) {
            tracing::warn!("Failed to clear search history: {}", e);
        }
    }

    fn persist(&self, entries: &[HistoryEntry]) {
        let result = serde_json::to_string(entries)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(HISTORY_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to save search history: {}", e);
        }
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
