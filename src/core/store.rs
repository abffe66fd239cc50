//! Durable persistence for the session list.
//!
//! Storage is a plain key-value shim: the whole session list lives under a
//! single key as a JSON array and every save overwrites it.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::core::constants::SESSIONS_KEY;
use crate::core::session::Session;
use crate::utils::atomic_write::write_atomic;

#[derive(Debug)]
pub enum StoreError {
    /// The backing storage could not be read or written.
    Io { key: String, source: std::io::Error },
    /// Persisted content was not a valid session list.
    Decode {
        key: String,
        source: serde_json::Error,
    },
    /// The session list could not be serialized.
    Encode(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { key, source } => write!(f, "Storage error for {key}: {source}"),
            StoreError::Decode { key, source } => {
                write!(f, "Stored sessions under {key} are unreadable: {source}")
            }
            StoreError::Encode(source) => write!(f, "Failed to serialize sessions: {source}"),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Decode { source, .. } => Some(source),
            StoreError::Encode(source) => Some(source),
        }
    }
}

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> std::io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for std::sync::Arc<T> {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        (**self).set(key, value)
    }
}

/// One file per key under a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        write_atomic(&self.path_for(key), value.as_bytes())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("memory storage poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("memory storage poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct SessionStore {
    storage: Box<dyn KeyValueStorage>,
    key: String,
}

impl SessionStore {
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, SESSIONS_KEY)
    }

    pub fn with_key(storage: Box<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Read the persisted session list. Nothing stored yet is an empty list.
    pub fn load(&self) -> Result<Vec<Session>, StoreError> {
        let raw = self.storage.get(&self.key).map_err(|source| StoreError::Io {
            key: self.key.clone(),
            source,
        })?;
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let sessions: Vec<Session> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                key: self.key.clone(),
                source,
            })?;
        debug!(key = %self.key, count = sessions.len(), "Loaded sessions");
        Ok(sessions)
    }

    /// Like [`SessionStore::load`], but any failure starts the app empty.
    pub fn load_or_empty(&self) -> Vec<Session> {
        self.load().unwrap_or_else(|err| {
            warn!(error = %err, "Discarding unreadable session history");
            Vec::new()
        })
    }

    /// Overwrite the persisted list with `sessions`.
    pub fn save(&self, sessions: &[Session]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(sessions).map_err(StoreError::Encode)?;
        self.storage
            .set(&self.key, &encoded)
            .map_err(|source| StoreError::Io {
                key: self.key.clone(),
                source,
            })
    }
}
