//! The persisted key/value tier.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::StoreError;

/// String key/value storage shared by the caches and the session state.
/// Values are JSON documents; the store does not look inside them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Vec<String>;
}

/// Process-local store. Used in tests and when no state file is configured.
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
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

/// One JSON object on disk, rewritten whole on every change. Writes go to
/// a sibling temp file first and are renamed into place.
///
/// Inside a tokio runtime the write runs on the blocking pool and `put`
/// returns once memory is updated; a failed background write is logged.
/// Outside a runtime the write happens before `put` returns.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    state: Arc<FileState>,
}

#[derive(Debug)]
struct FileState {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    // Serializes writers so the last rename carries the newest snapshot.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens `path`. A missing file is an empty store; an unreadable or
    /// corrupt one is logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_entries(&path) {
            Ok(entries) => {
                debug!(path = %path.display(), count = entries.len(), "loaded state file");
                entries
            }
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "state file unreadable; starting empty");
                BTreeMap::new()
            }
        };
        JsonFileStore {
            state: Arc::new(FileState { path, entries: Mutex::new(entries), write_lock: Mutex::new(()) }),
        }
    }

    fn schedule_persist(&self) -> Result<(), StoreError> {
        match Handle::try_current() {
            Ok(handle) => {
                let state = self.state.clone();
                handle.spawn_blocking(move || {
                    if let Err(e) = state.persist() {
                        warn!(path = %state.path.display(), error = %e, "writing state file failed");
                    }
                });
                Ok(())
            }
            Err(_) => self.state.persist(),
        }
    }
}

impl FileState {
    fn persist(&self) -> Result<(), StoreError> {
        let _writer = self.write_lock.lock();
        let snapshot = self.entries.lock().clone();

        let io_err = |source| StoreError::Io { path: self.path.display().to_string(), source };
        let tmp = self.path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush().map_err(io_err)?;
        writer.get_ref().sync_all().map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
    let entries = serde_json::from_reader(BufReader::new(file))?;
    Ok(entries)
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.state.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.state.entries.lock().insert(key.to_string(), value);
        self.schedule_persist()
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let removed = self.state.entries.lock().remove(key).is_some();
        if removed {
            self.schedule_persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.state.entries.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.put("a", "1".into()).unwrap();
        assert_eq!(store.get("a").as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        {
            let store = JsonFileStore::open(&path);
            store.put("book_language:7", r#"{"value":3,"timestamp":10}"#.into()).unwrap();
            store.put("session:last_book", "7".into()).unwrap();
            store.remove("session:last_book").unwrap();
        }
        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.keys(), vec!["book_language:7".to_string()]);
        assert!(reopened.get("book_language:7").unwrap().contains("\"value\":3"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert!(store.keys().is_empty());
        store.put("k", "v".into()).unwrap();
        assert_eq!(JsonFileStore::open(&path).get("k").as_deref(), Some("v"));
    }

    #[test]
    fn written_file_is_complete_and_temp_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::open(&path);
        let draft = "x".repeat(64 * 1024);
        store.put("term_draft:5", draft.clone()).unwrap();

        let on_disk: BTreeMap<String, String> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.get("term_draft:5"), Some(&draft));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn unwritable_location_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("missing").join("state.json"));
        assert!(matches!(store.put("k", "v".into()), Err(StoreError::Io { .. })));
        // The value is still served from memory.
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn puts_inside_a_runtime_reach_disk_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::open(&path);
        for n in 0..20 {
            store.put("session:last_book", n.to_string()).unwrap();
        }
        store.put("session:last_language", "3".into()).unwrap();
        store.remove("session:last_language").unwrap();

        let mut settled = false;
        for _ in 0..200 {
            let reopened = JsonFileStore::open(&path);
            if reopened.get("session:last_book").as_deref() == Some("19")
                && reopened.get("session:last_language").is_none()
            {
                settled = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(settled, "state file never caught up with the last write");
    }
}
