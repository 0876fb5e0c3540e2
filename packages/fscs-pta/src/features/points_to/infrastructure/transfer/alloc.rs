//! `p = alloca T`

use tracing::debug;

use super::{add_top_level_successors, TransferFunction};
use crate::features::context::ProgramPoint;
use crate::features::memory_model::MemoryObjectId;
use crate::features::points_to::domain::PtsSet;
use crate::features::points_to::infrastructure::eval_result::EvalResult;
use crate::shared::models::{CfgNode, TypeLayoutId, ValueId};

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_alloc(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        dest: ValueId,
        layout: TypeLayoutId,
        result: &mut EvalResult,
    ) {
        let object = self.allocate(point, dest, layout, false);
        let pointer = self.pointer_for(point, dest);
        if self.state.env.strong_update(pointer, PtsSet::singleton(object)) {
            add_top_level_successors(point, node, result);
        }
    }

    /// Object for an allocation at `point` defining `dest`. The allocation
    /// context is the point's context, truncated per allocation site under
    /// selective policies.
    pub(super) fn allocate(
        &mut self,
        point: ProgramPoint,
        dest: ValueId,
        layout: TypeLayoutId,
        heap: bool,
    ) -> MemoryObjectId {
        let state = &mut *self.state;
        let alloc_ctx = state.policy.alloc_context(&mut state.contexts, point.ctx, point.node);
        if alloc_ctx != point.ctx {
            debug!(site = %point.node, from = %point.ctx, to = %alloc_ctx, "allocation context truncated");
        }
        if heap {
            state.memory.allocate_heap(alloc_ctx, dest, layout)
        } else {
            state.memory.allocate_stack(alloc_ctx, dest, layout)
        }
    }
}
