use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::SessionStorage;
use crate::error::StorageError;

/// Store file name in the cache directory
pub const STORE_FILE: &str = "session-store.json";

/// Unencrypted fallback: all keys live in a single JSON object on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage at `<dir>/session-store.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
                debug!(path = %self.path.display(), "Removed empty store file");
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sessionkit-file-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = temp_dir("persist");
        FileStorage::in_dir(&dir).set("authToken", "abc").unwrap();

        let reopened = FileStorage::in_dir(&dir);
        assert_eq!(reopened.get("authToken").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("user").unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_removed_when_last_key_goes() {
        let dir = temp_dir("empty");
        let storage = FileStorage::in_dir(&dir);
        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.remove("a").unwrap();
        assert!(storage.path().exists());

        storage.remove("b").unwrap();
        assert!(!storage.path().exists());
        storage.remove("b").unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let storage = FileStorage::in_dir(&dir);
        std::fs::write(storage.path(), "not json").unwrap();
        assert!(matches!(storage.get("a"), Err(StorageError::Serialization(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
