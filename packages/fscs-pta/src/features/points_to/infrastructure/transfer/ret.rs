//! `ret v`: hand the return value and store back to every resolved caller

use super::{add_mem_level_successors, add_top_level_successors, TransferFunction};
use crate::features::context::ProgramPoint;
use crate::features::points_to::domain::Store;
use crate::features::points_to::infrastructure::eval_result::{EvalResult, StoreHandle};
use crate::shared::models::{CfgNodeKind, ValueId};

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_return(
        &mut self,
        point: ProgramPoint,
        value: Option<ValueId>,
        _local: &Store,
        result: &mut EvalResult,
    ) {
        let program = self.state.program;
        let callers: Vec<ProgramPoint> = self.state.call_graph.callers(point.function_context()).to_vec();
        let returned = value
            .and_then(|v| self.state.value_pts(point.ctx, v))
            .filter(|set| !set.is_empty());

        for caller in callers {
            let Some(call_node) = program.node(caller.node) else {
                continue;
            };
            let CfgNodeKind::Call { dest, .. } = &call_node.kind else {
                continue;
            };

            if let (Some(dest), Some(set)) = (dest, &returned) {
                let pointer = self.state.pointers.get_or_create(caller.ctx, *dest);
                if self.state.env.weak_update(pointer, set) {
                    add_top_level_successors(caller, call_node, result);
                }
            }
            add_mem_level_successors(caller, call_node, StoreHandle::Local, result);
        }
    }
}
