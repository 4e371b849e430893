// src/store.rs
//! Keyed string storage behind a small port trait.
//!
//! The quota tracker and result cache persist through `StorePort` so tests
//! can swap in `MemoryStore`. Storage is best-effort by contract: read
//! failures behave as "absent", write failures are logged and swallowed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Process-local key/value persistence. Writes are overwrite-last-wins;
/// readers tolerate staleness.
pub trait StorePort: Send + Sync {
    /// Returns the stored value, or `None` if absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;
    /// Stores `value` under `key`, replacing any prior value. Must not fail
    /// the caller; errors are logged and dropped.
    fn put(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store for tests and for running without a state directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorePort for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().expect("memory store mutex poisoned").get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.inner
            .lock()
            .expect("memory store mutex poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.lock().expect("memory store mutex poisoned").remove(key);
    }
}

/// File-backed store: one JSON object per service, loaded at open and
/// rewritten on every mutation. Small by construction (a handful of keys),
/// so whole-file rewrites are fine.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading existing contents if present.
    /// A missing or unparsable file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let inner = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            inner: Mutex::new(inner),
        }
    }

    fn persist(&self, map: &HashMap<String, String>) {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    tracing::warn!("state dir: {e:#}");
                    return;
                }
            }
        }
        let bytes = serde_json::to_vec_pretty(map).unwrap_or_default();
        if let Err(e) = std::fs::write(&self.path, bytes) {
            tracing::warn!("write state: {e:#}");
        }
    }
}

impl StorePort for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().expect("file store mutex poisoned").get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        let mut map = self.inner.lock().expect("file store mutex poisoned");
        map.insert(key.to_string(), value.to_string());
        self.persist(&map);
    }

    fn remove(&self, key: &str) {
        let mut map = self.inner.lock().expect("file store mutex poisoned");
        if map.remove(key).is_some() {
            self.persist(&map);
        }
    }
}
