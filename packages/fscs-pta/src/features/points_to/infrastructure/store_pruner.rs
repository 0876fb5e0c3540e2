//! Store pruning at call boundaries
//!
//! A callee only receives the part of the caller's store it can reach: the
//! targets of the call's pointer arguments, every non-stack, non-heap object
//! already in the store, and everything transitively reachable from those
//! through pointer fields and stored points-to sets.

use rustc_hash::FxHashSet;

use super::global_state::GlobalState;
use crate::features::context::ContextId;
use crate::features::memory_model::MemoryObjectId;
use crate::features::points_to::domain::Store;
use crate::shared::models::ValueId;

pub struct StorePruner<'s, 'p> {
    state: &'s mut GlobalState<'p>,
}

impl<'s, 'p> StorePruner<'s, 'p> {
    pub fn new(state: &'s mut GlobalState<'p>) -> Self {
        Self { state }
    }

    /// `store` restricted to what a call with `args` under `ctx` can reach
    pub fn prune(&mut self, store: &Store, ctx: ContextId, args: &[ValueId]) -> Store {
        let roots = self.roots(store, ctx, args);
        let reachable = self.reachable(store, roots);
        store.filtered(&reachable)
    }

    fn roots(&self, store: &Store, ctx: ContextId, args: &[ValueId]) -> Vec<MemoryObjectId> {
        let program = self.state.program;
        let mut roots = Vec::new();
        for arg in program.pointer_args(args) {
            if let Some(set) = self.state.value_pts(ctx, arg) {
                roots.extend(set.iter());
            }
        }
        for (object, _) in store.iter() {
            let memory = &self.state.memory;
            if !memory.is_stack(object) && !memory.is_heap(object) {
                roots.push(object);
            }
        }
        roots
    }

    fn reachable(&mut self, store: &Store, roots: Vec<MemoryObjectId>) -> FxHashSet<MemoryObjectId> {
        let mut visited: FxHashSet<MemoryObjectId> = FxHashSet::default();
        let mut worklist = roots;
        while let Some(object) = worklist.pop() {
            if !visited.insert(object) {
                continue;
            }
            for field in self.state.memory.reachable_pointer_objects(object, false) {
                if !visited.contains(&field) {
                    worklist.push(field);
                }
            }
            for target in store.lookup(object).iter() {
                if !visited.contains(&target) {
                    worklist.push(target);
                }
            }
        }
        visited
    }
}
