// Whole-JSON-blob persistence. Each key holds `{ "schemaVersion", "data" }`;
// a bare legacy value is read as version 0 and rewritten on first load.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

pub const SETTINGS_KEY: &str = "appSettings";
pub const NOTES_KEY: &str = "projectNotes";
pub const CATEGORIES_KEY: &str = "categories";

/// Newest envelope version this build reads and the one it writes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stored value for '{key}' is not valid: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored value for '{key}' has schema version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },
}

/// Raw string storage addressed by key.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError>;
}

// --- File-backed store ---

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        // Write-then-rename so a crash never leaves a half-written blob behind.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp, contents).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

// --- In-memory store ---

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().expect("memory store mutex");
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("memory store mutex");
        entries.insert(key.to_string(), contents.to_string());
        Ok(())
    }
}

// --- Typed load/save ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    schema_version: u32,
    data: Value,
}

// Returns (version, payload). Anything that is not exactly an envelope is a v0 blob.
fn split_envelope(value: Value) -> (u32, Value) {
    let is_envelope = value.as_object().is_some_and(|map| {
        map.len() == 2 && map.contains_key("schemaVersion") && map.contains_key("data")
    });
    if is_envelope {
        if let Ok(envelope) = serde_json::from_value::<Envelope>(value.clone()) {
            return (envelope.schema_version, envelope.data);
        }
    }
    (0, value)
}

/// Read and deserialize the value stored under `key`, or `None` if nothing is stored.
pub fn load<T>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StorageError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(raw) = store.read(key)? else {
        return Ok(None);
    };
    let malformed = |source| StorageError::Malformed {
        key: key.to_string(),
        source,
    };

    let value: Value = serde_json::from_str(&raw).map_err(malformed)?;
    let (version, data) = split_envelope(value);
    if version > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: key.to_string(),
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    // v0 blobs share the v1 payload shape; only the envelope is new.
    let parsed: T = serde_json::from_value(data).map_err(malformed)?;

    if version < SCHEMA_VERSION {
        tracing::info!(key, from = version, to = SCHEMA_VERSION, "migrating stored value");
        save(store, key, &parsed)?;
    }
    Ok(Some(parsed))
}

/// Serialize `value` in full and store it under `key`.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError> {
    let envelope = EnvelopeRef {
        schema_version: SCHEMA_VERSION,
        data: value,
    };
    let contents = serde_json::to_string_pretty(&envelope).map_err(|source| {
        StorageError::Malformed {
            key: key.to_string(),
            source,
        }
    })?;
    store.write(key, &contents)
}
