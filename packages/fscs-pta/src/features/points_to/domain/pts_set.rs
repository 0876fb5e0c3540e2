//! Immutable points-to sets
//!
//! A `PtsSet` is a sorted, deduplicated vector behind an `Arc`, so clones are
//! cheap and equality/hashing are structural. The universal object absorbs:
//! any set containing it is exactly `{universal}`.

use serde::{Serialize, Serializer};
use std::sync::Arc;

use crate::features::memory_model::MemoryObjectId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PtsSet {
    objects: Arc<Vec<MemoryObjectId>>,
}

impl PtsSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(object: MemoryObjectId) -> Self {
        Self {
            objects: Arc::new(vec![object]),
        }
    }

    pub fn universal() -> Self {
        Self::singleton(MemoryObjectId::UNIVERSAL)
    }

    pub fn null() -> Self {
        Self::singleton(MemoryObjectId::NULL)
    }

    fn from_sorted(objects: Vec<MemoryObjectId>) -> Self {
        if objects.first() == Some(&MemoryObjectId::UNIVERSAL) {
            return Self::universal();
        }
        Self {
            objects: Arc::new(objects),
        }
    }

    /// Set with `object` added
    pub fn insert(&self, object: MemoryObjectId) -> Self {
        if self.contains_universal() {
            return self.clone();
        }
        if object.is_universal() {
            return Self::universal();
        }
        match self.objects.binary_search(&object) {
            Ok(_) => self.clone(),
            Err(pos) => {
                let mut objects = Vec::with_capacity(self.objects.len() + 1);
                objects.extend_from_slice(&self.objects[..pos]);
                objects.push(object);
                objects.extend_from_slice(&self.objects[pos..]);
                Self::from_sorted(objects)
            }
        }
    }

    pub fn union(&self, other: &PtsSet) -> Self {
        if other.is_empty() || Arc::ptr_eq(&self.objects, &other.objects) {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        if self.contains_universal() || other.contains_universal() {
            return Self::universal();
        }

        let (lhs, rhs) = (&self.objects, &other.objects);
        let mut merged = Vec::with_capacity(lhs.len() + rhs.len());
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            match lhs[i].cmp(&rhs[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(lhs[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(rhs[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(lhs[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&lhs[i..]);
        merged.extend_from_slice(&rhs[j..]);

        if merged.len() == lhs.len() {
            return self.clone();
        }
        if merged.len() == rhs.len() {
            return other.clone();
        }
        Self::from_sorted(merged)
    }

    /// N-ary union
    pub fn merge_all<'a>(sets: impl IntoIterator<Item = &'a PtsSet>) -> Self {
        let mut objects: Vec<MemoryObjectId> = Vec::new();
        for set in sets {
            if set.contains_universal() {
                return Self::universal();
            }
            objects.extend(set.iter());
        }
        objects.sort_unstable();
        objects.dedup();
        Self::from_sorted(objects)
    }

    #[inline]
    pub fn has(&self, object: MemoryObjectId) -> bool {
        self.objects.binary_search(&object).is_ok()
    }

    /// `self ⊇ other`
    pub fn includes(&self, other: &PtsSet) -> bool {
        self.contains_universal() || other.iter().all(|o| self.has(o))
    }

    pub fn intersects(&self, other: &PtsSet) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|o| large.has(o))
    }

    #[inline]
    pub fn contains_universal(&self) -> bool {
        self.objects.first() == Some(&MemoryObjectId::UNIVERSAL)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MemoryObjectId> + '_ {
        self.objects.iter().copied()
    }

    /// The only member of a singleton set
    pub fn single(&self) -> Option<MemoryObjectId> {
        match self.objects.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl FromIterator<MemoryObjectId> for PtsSet {
    fn from_iter<I: IntoIterator<Item = MemoryObjectId>>(iter: I) -> Self {
        let mut objects: Vec<MemoryObjectId> = iter.into_iter().collect();
        objects.sort_unstable();
        objects.dedup();
        Self::from_sorted(objects)
    }
}

impl Serialize for PtsSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.objects.as_slice().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obj(n: u32) -> MemoryObjectId {
        MemoryObjectId(n)
    }

    #[test]
    fn test_insert_keeps_order() {
        let set = PtsSet::empty().insert(obj(5)).insert(obj(3)).insert(obj(5));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![obj(3), obj(5)]);
        assert_eq!(set, [obj(5), obj(3)].into_iter().collect());
    }

    #[test]
    fn test_union() {
        let a: PtsSet = [obj(2), obj(4)].into_iter().collect();
        let b: PtsSet = [obj(3), obj(4)].into_iter().collect();
        let u = a.union(&b);
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![obj(2), obj(3), obj(4)]);
        assert!(u.includes(&a) && u.includes(&b));
        assert_eq!(a.union(&PtsSet::empty()), a);
    }

    #[test]
    fn test_universal_absorbs() {
        let a: PtsSet = [obj(2), obj(4)].into_iter().collect();
        assert_eq!(a.union(&PtsSet::universal()), PtsSet::universal());
        assert_eq!(a.insert(MemoryObjectId::UNIVERSAL), PtsSet::universal());
        assert_eq!(PtsSet::universal().insert(obj(9)), PtsSet::universal());
        assert_eq!(
            PtsSet::merge_all([&a, &PtsSet::null(), &PtsSet::universal()]),
            PtsSet::universal()
        );
        let collected: PtsSet = [obj(7), MemoryObjectId::UNIVERSAL].into_iter().collect();
        assert_eq!(collected, PtsSet::universal());
    }

    #[test]
    fn test_intersects_and_single() {
        let a: PtsSet = [obj(2), obj(4)].into_iter().collect();
        let b: PtsSet = [obj(4)].into_iter().collect();
        let c: PtsSet = [obj(5)].into_iter().collect();
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(b.single(), Some(obj(4)));
        assert_eq!(a.single(), None);
    }
}
