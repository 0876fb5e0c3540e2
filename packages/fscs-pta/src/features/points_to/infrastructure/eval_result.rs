//! Output of one transfer function evaluation

use crate::features::context::ProgramPoint;
use crate::features::points_to::domain::Store;

/// Which store a memory-level successor receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHandle {
    /// The evaluated point's input store, unchanged
    Local,
    /// A store produced by the evaluation
    New(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Successor {
    pub point: ProgramPoint,
    /// `None` for top-level successors
    pub store: Option<StoreHandle>,
}

impl Successor {
    pub fn is_top_level(&self) -> bool {
        self.store.is_none()
    }
}

#[derive(Debug, Default)]
pub struct EvalResult {
    successors: Vec<Successor>,
    stores: Vec<Store>,
    modified: Option<usize>,
}

impl EvalResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_top_level(&mut self, point: ProgramPoint) {
        self.successors.push(Successor { point, store: None });
    }

    pub fn add_mem_level(&mut self, point: ProgramPoint, store: StoreHandle) {
        self.successors.push(Successor {
            point,
            store: Some(store),
        });
    }

    /// Register a store built by the evaluation
    pub fn push_store(&mut self, store: Store) -> StoreHandle {
        self.stores.push(store);
        StoreHandle::New(self.stores.len() - 1)
    }

    /// The evaluation's working copy of `local`, created on first use.
    /// Repeated calls return the same store.
    pub fn modified_store(&mut self, local: &Store) -> (StoreHandle, &mut Store) {
        let index = match self.modified {
            Some(index) => index,
            None => {
                self.stores.push(local.clone());
                let index = self.stores.len() - 1;
                self.modified = Some(index);
                index
            }
        };
        (StoreHandle::New(index), &mut self.stores[index])
    }

    /// Handle of the working copy if one was made, else the local store
    pub fn current_store(&self) -> StoreHandle {
        self.modified.map_or(StoreHandle::Local, StoreHandle::New)
    }

    pub fn store(&self, handle: StoreHandle) -> Option<&Store> {
        match handle {
            StoreHandle::Local => None,
            StoreHandle::New(index) => self.stores.get(index),
        }
    }

    pub fn successors(&self) -> &[Successor] {
        &self.successors
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }
}
