//! `p = q` and `p = phi(q, r, ...)`

use super::{add_top_level_successors, TransferFunction};
use crate::features::context::ProgramPoint;
use crate::features::points_to::domain::PtsSet;
use crate::features::points_to::infrastructure::eval_result::EvalResult;
use crate::shared::models::{CfgNode, ValueId};

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_copy(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        dest: ValueId,
        sources: &[ValueId],
        result: &mut EvalResult,
    ) {
        let sets: Vec<PtsSet> = sources
            .iter()
            .filter_map(|&source| self.state.value_pts(point.ctx, source))
            .collect();
        if sets.is_empty() {
            return;
        }

        let merged = PtsSet::merge_all(&sets);
        if merged.is_empty() {
            return;
        }
        let pointer = self.pointer_for(point, dest);
        if self.state.env.weak_update(pointer, &merged) {
            add_top_level_successors(point, node, result);
        }
    }
}
