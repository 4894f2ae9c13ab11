use super::RecordStore;
use crate::core::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-process record store. Used by tests and dry runs.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a value without counting it as a write.
    pub fn seed(&self, key: &str, value: Value) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(key.to_string(), value);
        }
    }

    /// Current stored value for `key`.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(key).cloned())
    }

    /// Number of `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryRecordStore {
    fn read_raw(&self, key: &str) -> Result<Option<Value>> {
        let records = self.records.lock()?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<()> {
        let mut records = self.records.lock()?;
        records.insert(key.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
