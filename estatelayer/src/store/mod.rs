//! Durable key/value storage for cache persistence.
//!
//! The bounds cache persists entries into a [`KeyValueStore`] so cached
//! listings survive a reload of the embedding application. The interface is
//! deliberately small and synchronous: string keys, string values, and an
//! enumeration primitive so the cache layer can sweep expired entries when
//! the store runs out of room.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStore`]: HashMap-backed, with an optional byte quota that
//!   models the tight storage budgets of embedded key/value stores.
//! - [`FileStore`]: one file per key under a root directory, for processes
//!   that restart.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while writing to a durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's size quota would be exceeded by this write.
    #[error("storage quota exceeded: {used} used + {incoming} incoming over {quota} bytes")]
    QuotaExceeded {
        used: u64,
        incoming: u64,
        quota: u64,
    },

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Synchronous string-keyed durable store.
///
/// Reads never fail visibly: a backend that cannot produce a value reports
/// absence, and the caller treats it as a cache miss. Only `set` surfaces
/// errors, because the cache layer reacts to quota failures by sweeping
/// expired entries.
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value, or `None` if absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value under `key`, replacing any existing value.
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Enumerate all stored keys.
    fn keys(&self) -> Vec<String>;
}

/// In-memory store with an optional byte quota.
///
/// The quota counts key and value bytes, approximating the budget a real
/// embedded store enforces. With no quota the store never rejects writes.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    /// Create a store that rejects writes once `quota_bytes` would be exceeded.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Current number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn used_bytes(entries: &HashMap<String, String>) -> u64 {
        entries
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if let Some(quota) = self.quota_bytes {
            // The write replaces any existing value, so discount it first.
            let existing = entries.get(key).map(|v| (key.len() + v.len()) as u64);
            let used = Self::used_bytes(&entries) - existing.unwrap_or(0);
            let incoming = (key.len() + value.len()) as u64;
            if used + incoming > quota {
                return Err(StoreError::QuotaExceeded {
                    used,
                    incoming,
                    quota,
                });
            }
        }
        entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

/// Envelope written to disk by [`FileStore`].
///
/// File names are hashes, so the original key travels inside the file.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    value: String,
}

/// File-backed store: one JSON file per key under a root directory.
///
/// Key strings contain characters that are awkward in file names, so each
/// file is named by the SHA-256 of its key.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let hash = Sha256::digest(key.as_bytes());
        self.root.join(format!("{:x}.json", hash))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let raw = fs::read_to_string(self.path_for(key)).ok()?;
        match serde_json::from_str::<StoredEntry>(&raw) {
            Ok(entry) => Some(entry.value),
            Err(e) => {
                debug!(error = %e, key = %key, "Dropping unreadable store file");
                let _ = fs::remove_file(self.path_for(key));
                None
            }
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let entry = StoredEntry {
            key: key.to_owned(),
            value,
        };
        let raw = serde_json::to_string(&entry)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(self.path_for(key), raw)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }

    fn keys(&self) -> Vec<String> {
        let Ok(dir) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        dir.filter_map(|entry| {
            let path = entry.ok()?.path();
            let raw = fs::read_to_string(path).ok()?;
            let entry: StoredEntry = serde_json::from_str(&raw).ok()?;
            Some(entry.key)
        })
        .collect()
    }
}
