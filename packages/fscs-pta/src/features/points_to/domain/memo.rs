//! Store cache per program point

use rustc_hash::FxHashMap;

use super::store::Store;
use crate::features::context::ProgramPoint;

#[derive(Debug, Clone, Default)]
pub struct Memo {
    stores: FxHashMap<ProgramPoint, Store>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `store` into the cached store at `point`.
    ///
    /// A first visit always counts as a change, even with an empty store.
    pub fn update(&mut self, point: ProgramPoint, store: &Store) -> bool {
        match self.stores.get_mut(&point) {
            Some(existing) => existing.merge_with(store),
            None => {
                self.stores.insert(point, store.clone());
                true
            }
        }
    }

    pub fn lookup(&self, point: &ProgramPoint) -> Option<&Store> {
        self.stores.get(point)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProgramPoint, &Store)> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
