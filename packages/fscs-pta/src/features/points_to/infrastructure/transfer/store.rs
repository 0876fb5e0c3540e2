//! `*p = q`

use super::{add_mem_level_successors, TransferFunction};
use crate::features::context::ProgramPoint;
use crate::features::memory_model::MemoryObjectId;
use crate::features::points_to::domain::{PtsSet, Store};
use crate::features::points_to::infrastructure::eval_result::{EvalResult, StoreHandle};
use crate::shared::models::{CfgNode, ValueId};

/// Strong update when `dest_set` is a single non-summary object, weak
/// update of every member otherwise. Special objects are never written.
pub(super) fn update_store(
    store: &mut Store,
    dest_set: &PtsSet,
    source_set: &PtsSet,
    is_summary: impl Fn(MemoryObjectId) -> bool,
) -> bool {
    match dest_set.single() {
        Some(object) if !is_summary(object) => store.strong_update(object, source_set.clone()),
        _ => {
            let mut changed = false;
            for object in dest_set.iter() {
                changed |= store.weak_update(object, source_set);
            }
            changed
        }
    }
}

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_store(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        dest: ValueId,
        source: ValueId,
        local: &Store,
        result: &mut EvalResult,
    ) {
        let source_set = self.state.value_pts(point.ctx, source).unwrap_or_default();
        let dest_set = self.state.value_pts(point.ctx, dest).unwrap_or_default();
        if source_set.is_empty() || dest_set.is_empty() {
            // Nothing to write yet; keep the store flowing
            add_mem_level_successors(point, node, StoreHandle::Local, result);
            return;
        }

        let memory = &self.state.memory;
        let (handle, store) = result.modified_store(local);
        update_store(store, &dest_set, &source_set, |o| memory.is_summary(o));
        add_mem_level_successors(point, node, handle, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u32]) -> PtsSet {
        ids.iter().map(|&i| MemoryObjectId(i)).collect()
    }

    #[test]
    fn test_strong_update_single_target() {
        let mut store = Store::new();
        store.weak_update(MemoryObjectId(4), &set(&[7]));
        update_store(&mut store, &set(&[4]), &set(&[8]), |_| false);
        assert_eq!(store.lookup(MemoryObjectId(4)), set(&[8]));
    }

    #[test]
    fn test_weak_update_summary_or_many() {
        let mut store = Store::new();
        store.weak_update(MemoryObjectId(4), &set(&[7]));
        update_store(&mut store, &set(&[4]), &set(&[8]), |_| true);
        assert_eq!(store.lookup(MemoryObjectId(4)), set(&[7, 8]));

        update_store(&mut store, &set(&[4, 5]), &set(&[9]), |_| false);
        assert_eq!(store.lookup(MemoryObjectId(4)), set(&[7, 8, 9]));
        assert_eq!(store.lookup(MemoryObjectId(5)), set(&[9]));
    }

    #[test]
    fn test_special_targets_ignored() {
        let mut store = Store::new();
        assert!(!update_store(&mut store, &PtsSet::null(), &set(&[9]), |_| false));
        assert!(store.is_empty());
    }
}
