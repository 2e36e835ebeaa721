//! Key/value backends for the session store
//!
//! The dashboard persists exactly two entries. `FileStore` keeps them in a
//! small JSON object on disk so a login survives between invocations;
//! `MemoryStore` is process-local.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{SessionError, SessionResult};

/// Persistent string key/value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> SessionResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SessionResult<()>;
    fn remove(&self, keys: &[&str]) -> SessionResult<()>;

    /// Write several entries as one operation
    fn set_many(&self, entries: &[(&str, &str)]) -> SessionResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> SessionResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| SessionError::Lock("memory store".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> SessionResult<()> {
        let mut entries = self.entries()?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> SessionResult<()> {
        let mut entries = self.entries()?;
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// JSON file store
///
/// Every mutation rewrites the whole file through a temp file + rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SessionResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> SessionResult<()> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> SessionResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SessionError::Lock(self.path.display().to_string()))?;
        // corrupt content is dropped on the next write
        let mut entries = match self.read_all() {
            Err(SessionError::Serialization(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding corrupt session file"
                );
                BTreeMap::new()
            }
            other => other?,
        };
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, keys: &[&str]) -> SessionResult<()> {
        self.update(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> SessionResult<()> {
        self.update(|entries| {
            for (key, value) in pairs {
                entries.insert(key.to_string(), value.to_string());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove(&["a", "b"]).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStore::new(&path).set("iot_token", "abc").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("iot_token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_store_removes_file_when_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::new(&path);

        store.set("iot_token", "abc").unwrap();
        assert!(path.exists());

        store.remove(&["iot_token"]).unwrap();
        assert!(!path.exists());
        assert_eq!(store.get("iot_token").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStore::new(&path).get("iot_token").unwrap_err();
        assert!(matches!(err, SessionError::Serialization(_)));
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        std::fs::write(&path, "{truncated").unwrap();
        let store = FileStore::new(&path);
        store.remove(&["iot_token", "iot_user"]).unwrap();
        assert!(!path.exists());

        std::fs::write(&path, "{truncated").unwrap();
        store.set_many(&[("iot_token", "fresh"), ("iot_user", "{}")]).unwrap();
        assert_eq!(store.get("iot_token").unwrap().as_deref(), Some("fresh"));
        assert_eq!(store.get("iot_user").unwrap().as_deref(), Some("{}"));
    }
}
