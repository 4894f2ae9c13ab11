use super::CacheEntity;
use crate::core::{CacheError, Result};
use crate::storage::{RecordSchema, RecordStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Id-indexed, order-preserving collection of entities backed by a [`RecordStore`] key.
///
/// Every mutator builds the next state, persists it in full, and only then swaps
/// it in. A failed write leaves both memory and disk at the previous state.
pub struct EntityCache<E: CacheEntity> {
    key: String,
    store: Arc<dyn RecordStore>,
    items: Vec<E>,
    index: HashMap<String, usize>,
}

impl<E: CacheEntity> EntityCache<E> {
    /// Creates an empty, not yet loaded cache under the entity's collection key.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_key(store, E::COLLECTION)
    }

    pub fn with_key(store: Arc<dyn RecordStore>, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            store,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates the cache and hydrates it from the store.
    pub fn open(store: Arc<dyn RecordStore>) -> Result<Self> {
        let mut cache = Self::new(store);
        cache.load()?;
        Ok(cache)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schema() -> RecordSchema {
        RecordSchema::collection(E::shape())
    }

    /// Rehydrates from the store, keeping the stored array order.
    pub fn load(&mut self) -> Result<()> {
        let stored = self.store.load(&self.key, &Self::schema());
        let Value::Array(values) = stored else {
            return Err(CacheError::Serialization(format!(
                "record '{}' is not an array after load",
                self.key
            )));
        };

        let total = values.len();
        let mut items = Vec::with_capacity(total);
        for value in values {
            match serde_json::from_value::<E>(value) {
                Ok(entity) => items.push(entity),
                Err(err) => warn!(collection = %self.key, error = %err, "dropping undecodable entity"),
            }
        }

        let (items, index) = build_index(items);
        let repaired = items.len() != total;
        self.items = items;
        self.index = index;
        debug!(collection = %self.key, count = self.items.len(), "cache loaded");

        if repaired {
            self.persist_current()?;
        }
        Ok(())
    }

    /// Entities in iteration order.
    pub fn get_all(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|e| e.id().to_string()).collect()
    }

    /// Inserts or overwrites by id. An existing entity keeps its position.
    pub fn add(&mut self, entity: E) -> Result<()> {
        let mut next = self.items.clone();
        match self.index.get(entity.id()) {
            Some(&pos) => next[pos] = entity,
            None => next.push(entity),
        }
        self.commit(next)
    }

    /// Removes by id. Absent ids are not an error; returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let Some(&pos) = self.index.get(id) else {
            return Ok(false);
        };
        let mut next = self.items.clone();
        next.remove(pos);
        self.commit(next)?;
        Ok(true)
    }

    /// Discards everything and rebuilds from `list` in the given order.
    pub fn replace_all(&mut self, list: Vec<E>) -> Result<()> {
        self.commit(list)
    }

    /// Applies `f` to an existing entity and persists. The id must not change.
    pub fn update<F>(&mut self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut E) -> Result<()>,
    {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| CacheError::not_found(&self.key, id))?;

        let mut next = self.items.clone();
        f(&mut next[pos])?;
        if next[pos].id() != id {
            return Err(CacheError::InvalidPayload(format!(
                "update of '{}' in '{}' tried to change its id to '{}'",
                id,
                self.key,
                next[pos].id()
            )));
        }
        self.commit(next)
    }

    /// Serialized form of the collection as it is persisted.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.items)?)
    }

    fn commit(&mut self, next: Vec<E>) -> Result<()> {
        let (items, index) = build_index(next);
        let value = serde_json::to_value(&items)?;
        self.store.save(&self.key, &value)?;
        self.items = items;
        self.index = index;
        Ok(())
    }

    fn persist_current(&self) -> Result<()> {
        let value = self.to_value()?;
        self.store.save(&self.key, &value)
    }
}

/// Deduplicates by id (a later duplicate overwrites the earlier one in place).
fn build_index<E: CacheEntity>(list: Vec<E>) -> (Vec<E>, HashMap<String, usize>) {
    let mut items: Vec<E> = Vec::with_capacity(list.len());
    let mut index = HashMap::with_capacity(list.len());
    for entity in list {
        match index.get(entity.id()) {
            Some(&pos) => items[pos] = entity,
            None => {
                index.insert(entity.id().to_string(), items.len());
                items.push(entity);
            }
        }
    }
    (items, index)
}
