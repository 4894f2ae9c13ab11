use super::{CacheEntity, EntityCache};
use crate::core::Result;
use std::collections::HashSet;

impl<E: CacheEntity> EntityCache<E> {
    /// Rebuilds iteration order from `ids`.
    ///
    /// Known ids keep their cached entity (cache-only fields included); unknown
    /// ids get a placeholder with default cache-only fields. Cached ids absent from
    /// `ids` are dropped, and repeated ids keep their first position.
    pub fn reorder<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let list = merge_order(self, ids);
        self.replace_all(list)
    }
}

/// The list `reorder` would commit, without touching the cache.
pub fn merge_order<E: CacheEntity, S: AsRef<str>>(cache: &EntityCache<E>, ids: &[S]) -> Vec<E> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .map(AsRef::as_ref)
        .filter(|id| seen.insert(*id))
        .map(|id| match cache.get(id) {
            Some(existing) => existing.clone(),
            None => E::placeholder(id),
        })
        .collect()
}
