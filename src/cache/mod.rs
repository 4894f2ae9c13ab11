//! In-memory entity caches hydrated from and flushed to a record store.

mod entity;
mod entity_cache;
mod merge;

pub use entity::{CacheEntity, RemoteRecord};
pub(crate) use entity::{decode_field, unknown_field};
pub use entity_cache::EntityCache;
pub use merge::merge_order;
