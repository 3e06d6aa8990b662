//! Sparse-set component storage
//!
//! Dense arrays keep iteration cache-friendly; the sparse map gives O(1)
//! lookup by entity. Removal swaps the last element into the hole.

use ahash::AHashMap;

use crate::core::types::EntityId;

#[derive(Debug, Clone)]
pub struct ComponentStore<T> {
    sparse: AHashMap<EntityId, usize>,
    ids: Vec<EntityId>,
    dense: Vec<T>,
}

impl<T> ComponentStore<T> {
    pub fn new() -> Self {
        Self {
            sparse: AHashMap::new(),
            ids: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Insert or replace. Returns the previous value if there was one.
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        if let Some(&idx) = self.sparse.get(&entity) {
            return Some(std::mem::replace(&mut self.dense[idx], value));
        }
        self.sparse.insert(entity, self.dense.len());
        self.ids.push(entity);
        self.dense.push(value);
        None
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let idx = self.sparse.remove(&entity)?;
        let last = self.dense.len() - 1;
        if idx != last {
            let moved = self.ids[last];
            self.sparse.insert(moved, idx);
        }
        self.ids.swap_remove(idx);
        Some(self.dense.swap_remove(idx))
    }

    #[inline]
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.sparse.get(&entity).map(|&idx| &self.dense[idx])
    }

    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        match self.sparse.get(&entity) {
            Some(&idx) => Some(&mut self.dense[idx]),
            None => None,
        }
    }

    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.sparse.contains_key(&entity)
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.ids.iter().copied().zip(self.dense.iter())
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
