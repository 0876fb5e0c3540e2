//! Flow-sensitive memory state at one program point

use rustc_hash::{FxHashMap, FxHashSet};

use super::pts_set::PtsSet;
use crate::features::memory_model::MemoryObjectId;

/// Memory object → points-to set.
///
/// The universal and null objects are never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    bindings: FxHashMap<MemoryObjectId, PtsSet>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set for unbound objects
    pub fn lookup(&self, object: MemoryObjectId) -> PtsSet {
        self.bindings.get(&object).cloned().unwrap_or_default()
    }

    /// Raw insert, used to seed special objects
    pub(crate) fn insert(&mut self, object: MemoryObjectId, set: PtsSet) {
        self.bindings.insert(object, set);
    }

    pub fn weak_update(&mut self, object: MemoryObjectId, set: &PtsSet) -> bool {
        if object.is_special() || set.is_empty() {
            return false;
        }
        match self.bindings.get_mut(&object) {
            Some(existing) => {
                let merged = existing.union(set);
                if merged == *existing {
                    return false;
                }
                *existing = merged;
                true
            }
            None => {
                self.bindings.insert(object, set.clone());
                true
            }
        }
    }

    pub fn strong_update(&mut self, object: MemoryObjectId, set: PtsSet) -> bool {
        if object.is_special() {
            return false;
        }
        match self.bindings.insert(object, set.clone()) {
            Some(previous) => previous != set,
            None => true,
        }
    }

    /// Pointwise union; returns whether `self` grew
    pub fn merge_with(&mut self, other: &Store) -> bool {
        let mut changed = false;
        for (&object, set) in &other.bindings {
            match self.bindings.get_mut(&object) {
                Some(existing) => {
                    let merged = existing.union(set);
                    if merged != *existing {
                        *existing = merged;
                        changed = true;
                    }
                }
                None => {
                    self.bindings.insert(object, set.clone());
                    changed = true;
                }
            }
        }
        changed
    }

    /// Copy restricted to `keep`
    pub fn filtered(&self, keep: &FxHashSet<MemoryObjectId>) -> Store {
        Store {
            bindings: self
                .bindings
                .iter()
                .filter(|(object, _)| keep.contains(object))
                .map(|(object, set)| (*object, set.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MemoryObjectId, &PtsSet)> {
        self.bindings.iter().map(|(o, s)| (*o, s))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u32]) -> PtsSet {
        ids.iter().map(|&i| MemoryObjectId(i)).collect()
    }

    #[test]
    fn test_special_objects_are_read_only() {
        let mut store = Store::new();
        assert!(!store.weak_update(MemoryObjectId::NULL, &set(&[4])));
        assert!(!store.strong_update(MemoryObjectId::UNIVERSAL, set(&[4])));
        assert!(store.is_empty());
    }

    #[test]
    fn test_strong_replaces_weak_grows() {
        let mut store = Store::new();
        let o = MemoryObjectId(9);
        store.weak_update(o, &set(&[2]));
        store.weak_update(o, &set(&[3]));
        assert_eq!(store.lookup(o), set(&[2, 3]));
        assert!(store.strong_update(o, set(&[4])));
        assert_eq!(store.lookup(o), set(&[4]));
    }

    #[test]
    fn test_merge_and_filter() {
        let mut a = Store::new();
        a.weak_update(MemoryObjectId(5), &set(&[2]));
        let mut b = Store::new();
        b.weak_update(MemoryObjectId(5), &set(&[3]));
        b.weak_update(MemoryObjectId(6), &set(&[3]));

        assert!(a.merge_with(&b));
        assert!(!a.merge_with(&b));
        assert_eq!(a.lookup(MemoryObjectId(5)), set(&[2, 3]));

        let keep: FxHashSet<_> = [MemoryObjectId(6)].into_iter().collect();
        let pruned = a.filtered(&keep);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned.lookup(MemoryObjectId(6)), set(&[3]));
    }
}
