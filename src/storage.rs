use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::types::Submission;

/// Key under which the submission history is kept unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "formSubmissions";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("Data stored under '{key}' is not a list of submissions: {source}")]
    NotACollection {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Blob store holding serialized text under string keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process store, used by tests and when embedding the engine.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<platform data dir>/dynform`, falling back to `~/.dynform`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir()
            .map(|d| d.join("dynform"))
            .or_else(|| dirs::home_dir().map(|h| h.join(".dynform")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes through a temporary file and an atomic rename to avoid partial blobs.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let temp = path.with_extension("tmp");
        let mut f = File::create(&temp)?;
        f.write_all(value.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, &path)?;
        Ok(())
    }
}

/// Keys become file names, so they must be non-empty and free of path syntax.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.trim().is_empty()
        || key.contains(['/', '\\'])
        || key == "."
        || key == ".."
        || key.contains('\0');
    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Reads the full collection. Absent, unreadable or unparseable data yields an empty
/// collection; entries that are not JSON objects are skipped.
pub fn read_submissions<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Vec<Submission> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read submissions, treating as empty");
            return Vec::new();
        }
    };

    let records = match serde_json::from_str::<Option<Vec<Value>>>(&raw) {
        Ok(records) => records.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(key, error = %err, "stored submissions are not valid, treating as empty");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(submission) => Some(submission),
            Err(err) => {
                tracing::warn!(key, index, error = %err, "skipping stored entry that is not a record");
                None
            }
        })
        .collect()
}

/// Raw stored records for an append. Only text that is not JSON at all counts as empty;
/// a JSON value that is not an array is refused so existing data is never overwritten.
fn load_records<S: KeyValueStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Vec<Value>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Option<Vec<Value>>>(&raw) {
        Ok(records) => Ok(records.unwrap_or_default()),
        Err(err) if err.is_syntax() || err.is_eof() => {
            tracing::warn!(key, error = %err, "stored submissions are not JSON, starting a new collection");
            Ok(Vec::new())
        }
        Err(source) => Err(StorageError::NotACollection {
            key: key.to_string(),
            source,
        }),
    }
}

/// Read-modify-write append of one submission. Returns the new collection length.
///
/// Earlier records are written back exactly as they were read. Not safe under
/// concurrent writers to the same key.
pub fn append_submission<S: KeyValueStore + ?Sized>(
    store: &mut S,
    key: &str,
    submission: &Submission,
) -> Result<usize, StorageError> {
    let mut records = load_records(&*store, key)?;
    records.push(serde_json::to_value(submission)?);
    let content = serde_json::to_string(&records)?;
    store.set(key, &content)?;
    Ok(records.len())
}
