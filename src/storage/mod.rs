//! Durable record storage: one JSON value per logical collection key.

pub mod memory;
pub mod persistence;
pub mod shape;

pub use memory::MemoryRecordStore;
pub use persistence::FileRecordStore;
pub use shape::{FieldShape, LoadState, ObjectShape, RecordSchema, Shape};

use crate::core::{CacheError, Result};
use serde_json::Value;
use tracing::{debug, warn};

/// Key/value persistence backing the entity caches.
///
/// Implementations only need raw reads and full-overwrite writes. Shape
/// validation and default substitution live in the provided [`RecordStore::load`].
pub trait RecordStore: Send + Sync {
    /// Reads the stored value. `Ok(None)` means nothing was ever written.
    fn read_raw(&self, key: &str) -> Result<Option<Value>>;

    /// Replaces the stored value. Must be durable before returning.
    fn write(&self, key: &str, value: &Value) -> Result<()>;

    /// Loads `key`, repairing or defaulting it against `schema`.
    ///
    /// Never fails: unreadable or corrupt data yields the schema default, and any
    /// substitution is written back so the store holds the value that was returned.
    fn load(&self, key: &str, schema: &RecordSchema) -> Value {
        let stored = match self.read_raw(key) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(key, error = %err, "stored record unreadable, using default");
                None
            }
        };

        let (value, state) = schema.resolve(stored.as_ref());
        match state {
            LoadState::Intact => {}
            LoadState::Repaired | LoadState::Defaulted => {
                if stored.is_some() {
                    warn!(key, ?state, "stored record did not match its shape");
                } else {
                    debug!(key, "initializing record with default");
                }
                if let Err(err) = self.write(key, &value) {
                    warn!(key, error = %err, "failed to write back repaired record");
                }
            }
        }
        value
    }

    /// Full overwrite of `key`.
    fn save(&self, key: &str, value: &Value) -> Result<()> {
        self.write(key, value)
    }
}

/// Keys become file names, so only a conservative character set is allowed.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::Config("Record key cannot be empty".to_string()));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CacheError::Config(format!(
            "Record key '{}' can only contain letters, numbers, '_' and '-'",
            key
        )));
    }

    if key.len() > 64 {
        return Err(CacheError::Config(format!(
            "Record key '{}' too long (max 64 characters)",
            key
        )));
    }

    Ok(())
}
