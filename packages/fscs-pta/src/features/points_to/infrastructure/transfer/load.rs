//! `p = *q`

use super::{add_mem_level_successors, add_top_level_successors, TransferFunction};
use crate::features::context::ProgramPoint;
use crate::features::points_to::domain::{PtsSet, Store};
use crate::features::points_to::infrastructure::eval_result::{EvalResult, StoreHandle};
use crate::shared::models::{CfgNode, ValueId};

/// `⋃ store[o]` for `o ∈ source_set`; an empty source set reads as universal
pub(super) fn load_from(source_set: &PtsSet, store: &Store) -> PtsSet {
    if source_set.is_empty() {
        return PtsSet::universal();
    }
    let mut sets = Vec::with_capacity(source_set.len());
    for object in source_set.iter() {
        let set = store.lookup(object);
        if set.contains_universal() {
            return PtsSet::universal();
        }
        if !set.is_empty() {
            sets.push(set);
        }
    }
    PtsSet::merge_all(&sets)
}

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_load(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        dest: ValueId,
        source: ValueId,
        local: &Store,
        result: &mut EvalResult,
    ) {
        let Some(source_set) = self.state.value_pts(point.ctx, source) else {
            return;
        };

        let loaded = load_from(&source_set, local);
        if !loaded.is_empty() {
            let pointer = self.pointer_for(point, dest);
            if self.state.env.weak_update(pointer, &loaded) {
                add_top_level_successors(point, node, result);
            }
        }
        add_mem_level_successors(point, node, StoreHandle::Local, result);
    }
}
