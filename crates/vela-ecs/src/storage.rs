//! Sparse-set component storage.
//!
//! Each component kind lives in its own [`SparseSet`]: values are packed in a
//! dense array alongside the owning ids, and a sparse table indexed by entity
//! slot points into the dense arrays. Insert, lookup and removal are O(1);
//! iteration touches only live values.

use std::any::Any;

use crate::entity::EntityId;

/// Type-erased view of a [`SparseSet`], so the world can hold one per kind.
pub(crate) trait ErasedStorage: Any {
    /// Drop `entity`'s value if present.
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    /// Drop every value.
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense storage for one component kind.
#[derive(Debug)]
pub struct SparseSet<T> {
    /// Entity slot -> position in the dense arrays.
    sparse: Vec<Option<u32>>,
    dense_ids: Vec<EntityId>,
    values: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            dense_ids: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn dense_index(&self, entity: EntityId) -> Option<usize> {
        let slot = (*self.sparse.get(entity.index() as usize)?)? as usize;
        // The slot may have been recycled; only the exact generation matches.
        (self.dense_ids[slot] == entity).then_some(slot)
    }

    /// Store `value` for `entity`, returning the value it replaced.
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        if let Some(slot) = self.dense_index(entity) {
            return Some(std::mem::replace(&mut self.values[slot], value));
        }
        let idx = entity.index() as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        // A stale generation may still occupy the slot; evict it first.
        if let Some(slot) = self.sparse[idx] {
            let stale = self.dense_ids[slot as usize];
            self.remove(stale);
        }
        self.sparse[idx] = Some(self.values.len() as u32);
        self.dense_ids.push(entity);
        self.values.push(value);
        None
    }

    /// The value stored for exactly this id and generation.
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.dense_index(entity).map(|slot| &self.values[slot])
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.dense_index(entity).map(move |slot| &mut self.values[slot])
    }

    /// Whether a value is stored for `entity`.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Remove and return `entity`'s value.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let slot = self.dense_index(entity)?;
        self.sparse[entity.index() as usize] = None;
        let last = self.values.len() - 1;
        if slot != last {
            let moved = self.dense_ids[last];
            self.sparse[moved.index() as usize] = Some(slot as u32);
        }
        self.dense_ids.swap_remove(slot);
        Some(self.values.swap_remove(slot))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(entity, value)` pairs in dense (insertion-ish) order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense_ids.iter().copied().zip(self.values.iter())
    }
}

impl<T: 'static> ErasedStorage for SparseSet<T> {
    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense_ids.clear();
        self.values.clear();
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut set = SparseSet::new();
        let e = EntityId::new(3, 0);
        assert_eq!(set.insert(e, 10u32), None);
        assert_eq!(set.get(e), Some(&10));
        assert_eq!(set.insert(e, 11), Some(10));
        assert_eq!(set.remove(e), Some(11));
        assert!(set.is_empty());
        assert_eq!(set.remove(e), None);
    }

    #[test]
    fn swap_remove_keeps_index_consistent() {
        let mut set = SparseSet::new();
        let ids: Vec<EntityId> = (0..5).map(|i| EntityId::new(i, 0)).collect();
        for (i, &id) in ids.iter().enumerate() {
            set.insert(id, i);
        }
        set.remove(ids[1]);
        for (i, &id) in ids.iter().enumerate() {
            if i == 1 {
                assert!(!set.contains(id));
            } else {
                assert_eq!(set.get(id), Some(&i));
            }
        }
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn stale_generation_is_not_visible() {
        let mut set = SparseSet::new();
        let old = EntityId::new(0, 0);
        let new = EntityId::new(0, 1);
        set.insert(old, "old");
        assert_eq!(set.get(new), None);

        set.insert(new, "new");
        assert_eq!(set.get(old), None);
        assert_eq!(set.get(new), Some(&"new"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut set = SparseSet::new();
        let e = EntityId::new(0, 0);
        set.insert(e, vec![1, 2]);
        set.get_mut(e).unwrap().push(3);
        assert_eq!(set.get(e).map(Vec::len), Some(3));
    }
}
