use crate::core::{CacheError, Result};
use crate::storage::Shape;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A typed item as delivered by the remote listing endpoint.
///
/// Decoding is strict: an item that does not deserialize or fails
/// [`RemoteRecord::validate`] is rejected instead of being patched up with defaults.
pub trait RemoteRecord: DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn validate(&self) -> std::result::Result<(), String> {
        if self.id().trim().is_empty() {
            return Err("item has an empty id".to_string());
        }
        Ok(())
    }

    fn decode(collection: &str, value: Value) -> Result<Self> {
        let record: Self = serde_json::from_value(value)
            .map_err(|err| CacheError::malformed(collection, err.to_string()))?;
        record
            .validate()
            .map_err(|reason| CacheError::malformed(collection, reason))?;
        Ok(record)
    }
}

/// An entity mirrored into a local cache.
///
/// Remote-originated fields are exposed through [`CacheEntity::remote_fields`] so the
/// reconciler can compare and correct them without knowing the concrete type.
/// Cache-only fields never appear there and are never touched by reconciliation.
pub trait CacheEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Remote: RemoteRecord;

    /// Store key and display name of the collection.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Builds a cached entity from a remote item; cache-only fields take their defaults.
    fn from_remote(remote: &Self::Remote) -> Self;

    /// Entity known only by id, with empty remote fields and default cache-only fields.
    fn placeholder(id: &str) -> Self;

    /// Remote-originated scalar fields in a stable order.
    fn remote_fields(&self) -> Vec<(&'static str, Value)>;

    fn set_remote_field(&mut self, field: &str, value: Value) -> Result<()>;

    /// Element shape used when loading the persisted collection.
    fn shape() -> Shape;

    /// Name of the nested collection field, if the entity owns one.
    fn nested_field() -> Option<&'static str> {
        None
    }

    /// Secondary identities of the nested items, in their current order.
    fn nested_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Copies nested item `key` from `source` (a freshly transformed remote entity).
    fn adopt_nested(&mut self, _key: &str, _source: &Self) {}

    /// Removes nested item `key`, returning whether it existed.
    fn remove_nested(&mut self, _key: &str) -> bool {
        false
    }
}

/// Shared helper for `set_remote_field` implementations.
pub(crate) fn decode_field<T: DeserializeOwned>(
    collection: &str,
    field: &str,
    value: Value,
) -> Result<T> {
    serde_json::from_value(value).map_err(|err| {
        CacheError::InvalidPayload(format!(
            "field '{}' of '{}' has the wrong type: {}",
            field, collection, err
        ))
    })
}

pub(crate) fn unknown_field(collection: &str, field: &str) -> CacheError {
    CacheError::InvalidPayload(format!(
        "'{}' is not a remote field of '{}'",
        field, collection
    ))
}
