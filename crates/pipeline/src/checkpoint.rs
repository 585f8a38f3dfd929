use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::error::CheckpointError;

/// Persisted checkpoints, one timestamp per source locator.
pub trait CheckpointStore: Send + Sync {
    fn load_all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, CheckpointError>;

    fn store(&self, locator: &str, checkpoint: DateTime<Utc>) -> Result<(), CheckpointError>;
}

/// JSON file of `{ locator: RFC 3339 timestamp }`.
///
/// Every store rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written file behind.
pub struct FileCheckpointStore {
    path: PathBuf,
    state: Mutex<BTreeMap<String, DateTime<Utc>>>,
}

impl FileCheckpointStore {
    /// Open the file, treating a missing file as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();
        let state = read_file(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load_all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, CheckpointError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store(&self, locator: &str, checkpoint: DateTime<Utc>) -> Result<(), CheckpointError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.insert(locator.to_string(), checkpoint);

        let json = serde_json::to_vec_pretty(&*state).map_err(|source| CheckpointError::Format {
            path: self.path.clone(),
            source,
        })?;
        let io_err = |source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<BTreeMap<String, DateTime<Utc>>, CheckpointError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| CheckpointError::Format {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(source) => Err(CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// In-process store, for debug runs and tests.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    state: Mutex<BTreeMap<String, DateTime<Utc>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(entries: impl IntoIterator<Item = (String, DateTime<Utc>)>) -> Self {
        Self {
            state: Mutex::new(entries.into_iter().collect()),
        }
    }

    pub fn get(&self, locator: &str) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locator)
            .copied()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load_all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, CheckpointError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store(&self, locator: &str, checkpoint: DateTime<Utc>) -> Result<(), CheckpointError> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.to_string(), checkpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path().join("none.json")).unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn stored_checkpoints_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("checkpoints.json");
        let ts = Utc.with_ymd_and_hms(2012, 9, 4, 10, 30, 0).unwrap();

        let store = FileCheckpointStore::open(&path).unwrap();
        store.store("https://issues.example.org/jira", ts).unwrap();
        drop(store);

        let reopened = FileCheckpointStore::open(&path).unwrap();
        let all = reopened.load_all().unwrap();
        assert_eq!(all.get("https://issues.example.org/jira"), Some(&ts));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FileCheckpointStore::open(&path),
            Err(CheckpointError::Format { .. })
        ));
    }
}
