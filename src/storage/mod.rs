//! The persistence boundary: a string-keyed store with JSON string values.
//!
//! Everything the application persists (accounts, the current-session
//! pointer, saved conversations) goes through [`KeyValueStore`] so tests can
//! substitute [`MemoryStore`] for the on-disk [`FileStore`]. Reads are
//! tolerant: a missing or unreadable key is reported as absent rather than
//! as an error.

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug)]
pub enum StorageError {
    /// Failed to write or delete the document backing a key.
    Io {
        key: String,
        source: std::io::Error,
    },

    /// Failed to serialize a value before writing it.
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { key, source } => {
                write!(f, "Failed to persist key '{}': {}", key, source)
            }
            StorageError::Encode { key, source } => {
                write!(f, "Failed to encode value for key '{}': {}", key, source)
            }
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Encode { source, .. } => Some(source),
        }
    }
}

pub trait KeyValueStore {
    /// Read the value for a key. Missing and unreadable entries both come
    /// back as `None`.
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read a key and deserialize it, treating corruption as absence.
pub fn get_json<T, S>(store: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(key, %err, "discarding unreadable stored value");
            None
        }
    }
}

/// Serialize a value and write it under a key.
pub fn set_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

/// On-disk binding: one JSON document per key under the platform data
/// directory. Writes go through a temp file rename so a crash mid-write
/// never leaves a half-written document behind.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open_default() -> Result<Self, Box<dyn StdError>> {
        let proj_dirs = ProjectDirs::from("io", "kilnworks", "kilnchat")
            .ok_or("Failed to determine data directory")?;
        Self::open_in(proj_dirs.data_dir().join("state"))
    }

    pub fn open_in(dir: impl Into<PathBuf>) -> Result<Self, Box<dyn StdError>> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal identifiers; anything outside the safe set is
        // mapped to '-' so a key can never escape the store directory.
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        temp_file.write_all(value.as_bytes()).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file
            .persist(self.path_for(key))
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-memory binding used by tests and available for ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn file_store_round_trips_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open_in(dir.path()).expect("open store");

        assert!(store.get("missing").is_none());

        store.set("greeting", "\"hello\"").expect("set");
        assert_eq!(store.get("greeting").as_deref(), Some("\"hello\""));

        store.remove("greeting").expect("remove");
        assert!(store.get("greeting").is_none());

        // Removing again is a no-op.
        store.remove("greeting").expect("remove absent");
    }

    #[test]
    fn file_store_keys_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open_in(dir.path()).expect("open store");

        store.set("../escape/attempt", "\"x\"").expect("set");
        assert_eq!(store.get("../escape/attempt").as_deref(), Some("\"x\""));
        assert!(!dir.path().join("../escape").exists());
    }

    #[test]
    fn json_helpers_round_trip_and_tolerate_corruption() {
        let store = MemoryStore::new();
        let value = Sample {
            name: "clinker".to_string(),
            count: 3,
        };

        set_json(&store, "sample", &value).expect("set");
        assert_eq!(get_json::<Sample, _>(&store, "sample"), Some(value));

        store.set("sample", "{not json").expect("set raw");
        assert_eq!(get_json::<Sample, _>(&store, "sample"), None);

        assert_eq!(get_json::<Sample, _>(&store, "absent"), None);
    }

    #[test]
    fn memory_store_isolates_clones_by_shared_map() {
        let store = MemoryStore::new();
        let alias = store.clone();

        store.set("k", "v").expect("set");
        assert_eq!(alias.get("k").as_deref(), Some("v"));

        alias.remove("k").expect("remove");
        assert!(store.get("k").is_none());
    }
}
