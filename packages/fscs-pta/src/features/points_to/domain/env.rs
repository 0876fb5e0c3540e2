//! Flow-insensitive, context-sensitive pointer environment

use rustc_hash::FxHashMap;

use super::pts_set::PtsSet;
use crate::features::memory_model::PointerId;

/// Pointer → points-to set
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: FxHashMap<PointerId, PtsSet>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set for unbound pointers
    pub fn lookup(&self, pointer: PointerId) -> PtsSet {
        self.bindings.get(&pointer).cloned().unwrap_or_default()
    }

    pub fn contains(&self, pointer: PointerId) -> bool {
        self.bindings.contains_key(&pointer)
    }

    /// Grow the binding; returns whether it changed
    pub fn weak_update(&mut self, pointer: PointerId, set: &PtsSet) -> bool {
        match self.bindings.get_mut(&pointer) {
            Some(existing) => {
                let merged = existing.union(set);
                if merged == *existing {
                    return false;
                }
                *existing = merged;
                true
            }
            None => {
                self.bindings.insert(pointer, set.clone());
                true
            }
        }
    }

    /// Replace the binding; returns whether it changed
    pub fn strong_update(&mut self, pointer: PointerId, set: PtsSet) -> bool {
        match self.bindings.insert(pointer, set.clone()) {
            Some(previous) => previous != set,
            None => true,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointerId, &PtsSet)> {
        self.bindings.iter().map(|(p, s)| (*p, s))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
