//! `p = q + offset` (field access) and `p = q + i * stride` (array index)

use super::{add_top_level_successors, TransferFunction};
use crate::features::context::ProgramPoint;
use crate::features::memory_model::MemoryObjectId;
use crate::features::points_to::domain::PtsSet;
use crate::features::points_to::infrastructure::eval_result::EvalResult;
use crate::shared::models::{CfgNode, ValueId};

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_offset(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        dest: ValueId,
        source: ValueId,
        offset: u64,
        array_ref: bool,
        result: &mut EvalResult,
    ) {
        let Some(source_set) = self.state.value_pts(point.ctx, source) else {
            return;
        };
        if source_set.is_empty() {
            return;
        }

        let mut targets: Vec<MemoryObjectId> = Vec::new();
        for object in source_set.iter() {
            if object.is_null() {
                continue;
            }
            if object.is_universal() {
                targets.push(MemoryObjectId::UNIVERSAL);
                break;
            }
            if array_ref {
                targets.extend(self.index_targets(object, offset));
            } else {
                targets.push(self.state.memory.offset_memory(object, offset));
            }
        }
        if targets.is_empty() {
            return;
        }

        let set: PtsSet = targets.into_iter().collect();
        let pointer = self.pointer_for(point, dest);
        if self.state.env.weak_update(pointer, &set) {
            add_top_level_successors(point, node, result);
        }
    }

    /// Targets of `object + i * stride` for an unknown `i`. Inside an array
    /// region every element folds onto one summary object; outside one, the
    /// index may land on any later pointer field of the block.
    fn index_targets(&mut self, object: MemoryObjectId, stride: u64) -> Vec<MemoryObjectId> {
        let memory = &mut self.state.memory;
        let stepped = memory.offset_memory(object, stride);
        let folds = !stepped.is_universal()
            && memory.is_summary(stepped)
            && memory.offset_memory(stepped, stride) == stepped;
        if folds {
            return if stepped == object {
                vec![object]
            } else {
                vec![object, stepped]
            };
        }
        memory.reachable_pointer_objects(object, true)
    }
}
