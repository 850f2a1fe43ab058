//! Presence persistence
//!
//! Values live in a two-level namespace, `family -> key -> value`, matching
//! the host's database layout (`CustomPresence` / `PJSIP/alice` -> `Available`).
//! Writes overwrite: the last writer for a key wins.

use crate::error::StoreError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Durable key-value sink for presence state
pub trait PresenceStore: Send + Sync {
    /// Store `value` under `family`/`key`, replacing any previous value
    fn put(&self, family: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read the value under `family`/`key`
    fn get(&self, family: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `family`/`key`; returns whether a value was present
    fn delete(&self, family: &str, key: &str) -> Result<bool, StoreError>;
}

/// In-memory store, process lifetime only
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<(String, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PresenceStore for MemoryStore {
    fn put(&self, family: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .insert((family.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn get(&self, family: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .get(&(family.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn delete(&self, family: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .remove(&(family.to_string(), key.to_string()))
            .is_some())
    }
}

type Families = BTreeMap<String, BTreeMap<String, String>>;

/// JSON-file backed store.
///
/// The whole file is held in memory and rewritten on every mutation through a
/// temporary sibling file followed by a rename, so a crash mid-write leaves
/// the previous contents intact. A write that cannot reach the file leaves
/// the in-memory view untouched as well.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    families: Mutex<Families>,
}

impl FileStore {
    /// Open the store at `path`, creating an empty one if the file is absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let families = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => Families::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Presence store {} does not exist yet, starting empty", path.display());
                Families::new()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        debug!(
            "Opened presence store {} with {} families",
            path.display(),
            families.len()
        );

        Ok(Self {
            path,
            families: Mutex::new(families),
        })
    }

    fn flush(&self, families: &Families) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let json = serde_json::to_vec_pretty(families).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl PresenceStore for FileStore {
    fn put(&self, family: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut families = self.families.lock();
        let mut updated = families.clone();
        updated
            .entry(family.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());

        // Memory only changes once the file does
        self.flush(&updated)?;
        *families = updated;
        Ok(())
    }

    fn get(&self, family: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .families
            .lock()
            .get(family)
            .and_then(|keys| keys.get(key))
            .cloned())
    }

    fn delete(&self, family: &str, key: &str) -> Result<bool, StoreError> {
        let mut families = self.families.lock();
        if !families.get(family).is_some_and(|keys| keys.contains_key(key)) {
            return Ok(false);
        }

        let mut updated = families.clone();
        if let Some(keys) = updated.get_mut(family) {
            keys.remove(key);
            if keys.is_empty() {
                updated.remove(family);
            }
        }

        self.flush(&updated)?;
        *families = updated;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.put("CustomPresence", "PJSIP/alice", "Available").unwrap();
        store.put("CustomPresence", "PJSIP/alice", "Unavailable").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("CustomPresence", "PJSIP/alice").unwrap().as_deref(),
            Some("Unavailable")
        );
        assert_eq!(store.get("Other", "PJSIP/alice").unwrap(), None);
    }

    #[test]
    fn test_memory_store_delete() {
        let store = MemoryStore::new();
        store.put("CustomPresence", "PJSIP/bob", "Available").unwrap();
        assert!(store.delete("CustomPresence", "PJSIP/bob").unwrap());
        assert!(!store.delete("CustomPresence", "PJSIP/bob").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presence.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.put("CustomPresence", "PJSIP/alice", "Available").unwrap();
            store.put("CustomPresence", "PJSIP/bob", "Unavailable").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.get("CustomPresence", "PJSIP/alice").unwrap().as_deref(),
            Some("Available")
        );
        assert_eq!(
            store.get("CustomPresence", "PJSIP/bob").unwrap().as_deref(),
            Some("Unavailable")
        );
        assert!(!dir.path().join("presence.json.tmp").exists());
    }

    #[test]
    fn test_file_store_delete_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presence.json");

        let store = FileStore::open(&path).unwrap();
        store.put("CustomPresence", "PJSIP/alice", "Available").unwrap();
        assert!(store.delete("CustomPresence", "PJSIP/alice").unwrap());
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("CustomPresence", "PJSIP/alice").unwrap(), None);
    }

    #[test]
    fn test_failed_put_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let store = FileStore::open(sub.join("presence.json")).unwrap();
        store.put("CustomPresence", "PJSIP/bob", "Unavailable").unwrap();
        fs::remove_dir_all(&sub).unwrap();

        let err = store.put("CustomPresence", "PJSIP/alice", "Available").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.get("CustomPresence", "PJSIP/alice").unwrap(), None);

        let err = store.put("CustomPresence", "PJSIP/bob", "Available").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(
            store.get("CustomPresence", "PJSIP/bob").unwrap().as_deref(),
            Some("Unavailable")
        );
    }

    #[test]
    fn test_failed_delete_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let store = FileStore::open(sub.join("presence.json")).unwrap();
        store.put("CustomPresence", "PJSIP/alice", "Available").unwrap();
        fs::remove_dir_all(&sub).unwrap();

        assert!(store.delete("CustomPresence", "PJSIP/alice").is_err());
        assert_eq!(
            store.get("CustomPresence", "PJSIP/alice").unwrap().as_deref(),
            Some("Available")
        );
        assert!(!store.delete("CustomPresence", "PJSIP/nobody").unwrap());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presence.json");
        fs::write(&path, b"{not json").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
