//! Client-local persisted state
//!
//! A small keyed store for advisory, non-authoritative state: the hidden
//! record set and the last-upload change token. Injected explicitly into the
//! view layer; never a free-floating side channel.

use log::warn;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Mutex;

/// Key holding the JSON-encoded hidden content references
pub const HIDDEN_RECORDS_KEY: &str = "hidden_records";

/// Key holding the last-upload timestamp change token
pub const LAST_UPLOAD_KEY: &str = "last_upload";

/// Keyed get/set/remove store for client-local state. Values are opaque
/// strings; last writer wins.
pub trait LocalStateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// One JSON object persisted to a single file. Every write rewrites the
/// whole file, which is the last-writer-wins policy the advisory state
/// needs.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                _ => {
                    warn!("local state file {} is not a JSON object, starting empty", path.display());
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        match serde_json::to_vec_pretty(&Value::Object(entries.clone())) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&self.path, bytes) {
                    warn!("failed to persist local state to {}: {e}", self.path.display());
                }
            }
            Err(e) => warn!("failed to encode local state: {e}"),
        }
    }
}

impl LocalStateStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).and_then(|v| v.as_str()).map(String::from)
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), Value::String(value.to_string()));
            self.persist(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
            self.persist(&entries);
        }
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<Map<String, Value>>,
}

impl LocalStateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).and_then(|v| v.as_str()).map(String::from)
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}
