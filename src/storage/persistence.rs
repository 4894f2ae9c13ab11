//! File-backed record store: one pretty-printed JSON file per key.

use super::{RecordStore, validate_key};
use crate::core::{CacheError, Result};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            CacheError::Io(format!(
                "Failed to create store directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn checked_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.path_for(key))
    }
}

impl RecordStore for FileRecordStore {
    fn read_raw(&self, key: &str) -> Result<Option<Value>> {
        let path = self.checked_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .map_err(|e| CacheError::Io(format!("Failed to read '{}': {}", path.display(), e)))?;
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            CacheError::Serialization(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        Ok(Some(value))
    }

    fn write(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.checked_path(key)?;
        let bytes = serde_json::to_vec_pretty(value)?;

        // Temp file in the same directory so the final rename stays on one filesystem.
        let mut temp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| CacheError::Io(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(&bytes)
            .map_err(|e| CacheError::Io(format!("Failed to write '{}': {}", key, e)))?;
        temp.flush()
            .map_err(|e| CacheError::Io(format!("Failed to flush '{}': {}", key, e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| CacheError::Io(format!("Failed to sync '{}': {}", key, e)))?;
        temp.persist(&path).map_err(|e| {
            CacheError::Io(format!("Failed to persist '{}': {}", path.display(), e.error))
        })?;

        debug!(key, bytes = bytes.len(), "record persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RecordSchema, Shape};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_read_back() {
        let dir = tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).unwrap();

        store.save("employees", &json!([{"id": "1"}])).unwrap();
        assert_eq!(
            store.read_raw("employees").unwrap(),
            Some(json!([{"id": "1"}]))
        );
        let files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("employees.json")]);
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).unwrap();
        assert_eq!(store.read_raw("products").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_loads_default_and_is_rewritten() {
        let dir = tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).unwrap();
        fs::write(store.path_for("products"), b"{ not json").unwrap();

        assert!(store.read_raw("products").is_err());

        let value = store.load("products", &RecordSchema::collection(Shape::Any));
        assert_eq!(value, json!([]));
        assert_eq!(store.read_raw("products").unwrap(), Some(json!([])));
    }

    #[test]
    fn test_unsafe_keys_are_rejected_on_both_paths() {
        let dir = tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).unwrap();

        assert!(matches!(
            store.save("../escape", &json!([])),
            Err(CacheError::Config(_))
        ));
        assert!(matches!(store.read_raw("a b"), Err(CacheError::Config(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FileRecordStore::open(dir.path()).unwrap();
            store.save("counterparties", &json!([{"id": "c1"}])).unwrap();
        }

        let reopened = FileRecordStore::open(dir.path()).unwrap();
        let value = reopened.load("counterparties", &RecordSchema::collection(Shape::Any));
        assert_eq!(value, json!([{"id": "c1"}]));
    }
}
