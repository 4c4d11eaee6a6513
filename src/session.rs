use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

pub const FORM_DATA_KEY: &str = "form-data";
pub const GRAPH_SNAPSHOT_KEY: &str = "graph-snapshot";
pub const NODE_POSITIONS_KEY: &str = "node-positions";

/// Cross-run cache for form values, the last graph snapshot, and node drag
/// positions. String-keyed JSON values, last write wins, no versioning.
/// Injected so tests can swap in the in-memory implementation.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

pub fn store_json<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(encoded) => store.put(key, encoded),
        Err(error) => warn!(key, %error, "failed to encode session entry"),
    }
}

pub fn load_json<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "discarding unreadable session entry");
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.entries().insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

/// File-backed store: the whole map is rewritten on every change. Write
/// failures are logged and swallowed; a persistence problem never takes the
/// UI down.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        let encoded = match serde_json::to_string_pretty(entries) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to encode session file");
                return;
            }
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(error) = fs::create_dir_all(parent)
        {
            warn!(path = %self.path.display(), %error, "failed to create session directory");
            return;
        }
        if let Err(error) = fs::write(&self.path, encoded) {
            warn!(path = %self.path.display(), %error, "failed to write session file");
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        let mut entries = self.entries();
        entries.insert(key.to_owned(), value);
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries();
        entries.remove(key);
        self.persist(&entries);
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return BTreeMap::new(),
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(path = %path.display(), %error, "ignoring unreadable session file");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::test_support::{remove_file_if_exists, temp_path};

    use super::{
        FileSessionStore, MemorySessionStore, SessionStore, load_json, store_json,
    };

    #[test]
    fn memory_store_round_trips_and_removes_entries() {
        let store = MemorySessionStore::default();
        assert_eq!(store.get("missing"), None);

        store.put("form-data", "{\"username\":\"dev\"}".to_owned());
        assert_eq!(
            store.get("form-data").as_deref(),
            Some("{\"username\":\"dev\"}")
        );

        store.remove("form-data");
        assert_eq!(store.get("form-data"), None);
    }

    #[test]
    fn last_write_wins_on_the_same_key() {
        let store = MemorySessionStore::default();
        store.put("key", "first".to_owned());
        store.put("key", "second".to_owned());
        assert_eq!(store.get("key").as_deref(), Some("second"));
    }

    #[test]
    fn file_store_persists_entries_across_reopen() {
        let path = temp_path("session-reopen").with_extension("json");

        {
            let store = FileSessionStore::open(&path);
            store.put("graph-snapshot", "{\"nodes\":[]}".to_owned());
        }
        let reopened = FileSessionStore::open(&path);
        assert_eq!(
            reopened.get("graph-snapshot").as_deref(),
            Some("{\"nodes\":[]}")
        );

        remove_file_if_exists(&path);
    }

    #[test]
    fn file_store_tolerates_a_corrupt_session_file() {
        let path = temp_path("session-corrupt").with_extension("json");
        fs::write(&path, "not json at all").expect("corrupt file should be written");

        let store = FileSessionStore::open(&path);
        assert_eq!(store.get("anything"), None);
        store.put("fresh", "value".to_owned());
        assert_eq!(store.get("fresh").as_deref(), Some("value"));

        remove_file_if_exists(&path);
    }

    #[test]
    fn typed_helpers_round_trip_and_discard_bad_payloads() {
        let store = MemorySessionStore::default();
        store_json(&store, "positions", &vec![1_u32, 2, 3]);
        assert_eq!(
            load_json::<Vec<u32>>(&store, "positions"),
            Some(vec![1, 2, 3])
        );

        store.put("positions", "{broken".to_owned());
        assert_eq!(load_json::<Vec<u32>>(&store, "positions"), None);
    }
}
