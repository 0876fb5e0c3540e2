//! Transfer functions
//!
//! One evaluation per program point. Top-level nodes (alloc, copy, offset)
//! only touch the environment and wake their def-use successors. Memory nodes
//! (load, store, call, ret) additionally read the point's input store and
//! forward a store to their memory-level successors; they are skipped until a
//! store has reached them.

mod alloc;
mod call;
mod copy;
mod external;
mod load;
mod offset;
mod ret;
mod store;

use tracing::trace;

use super::eval_result::{EvalResult, StoreHandle};
use super::global_state::GlobalState;
use crate::features::context::ProgramPoint;
use crate::features::memory_model::PointerId;
use crate::features::points_to::domain::Store;
use crate::shared::models::{CfgNode, CfgNodeKind, NodeRef, ValueId};

pub struct TransferFunction<'s, 'p> {
    state: &'s mut GlobalState<'p>,
    local: Option<&'s Store>,
}

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub fn new(state: &'s mut GlobalState<'p>, local: Option<&'s Store>) -> Self {
        Self { state, local }
    }

    pub fn eval(&mut self, point: ProgramPoint) -> EvalResult {
        let mut result = EvalResult::new();
        let program = self.state.program;
        let Some(node) = program.node(point.node) else {
            return result;
        };
        trace!(point = %point, kind = node.kind.name(), "eval");

        match &node.kind {
            CfgNodeKind::Entry => self.eval_entry(point, node, &mut result),
            CfgNodeKind::Alloc { dest, layout } => self.eval_alloc(point, node, *dest, *layout, &mut result),
            CfgNodeKind::Copy { dest, sources } => self.eval_copy(point, node, *dest, sources, &mut result),
            CfgNodeKind::Offset {
                dest,
                source,
                offset,
                array_ref,
            } => self.eval_offset(point, node, *dest, *source, *offset, *array_ref, &mut result),
            CfgNodeKind::Load { dest, source } => {
                if let Some(local) = self.local {
                    self.eval_load(point, node, *dest, *source, local, &mut result);
                }
            }
            CfgNodeKind::Store { dest, source } => {
                if let Some(local) = self.local {
                    self.eval_store(point, node, *dest, *source, local, &mut result);
                }
            }
            CfgNodeKind::Call { .. } => {
                if let Some(local) = self.local {
                    self.eval_call(point, node, local, &mut result);
                }
            }
            CfgNodeKind::Ret { value } => {
                if let Some(local) = self.local {
                    self.eval_return(point, *value, local, &mut result);
                }
            }
        }
        result
    }

    fn eval_entry(&mut self, point: ProgramPoint, node: &CfgNode, result: &mut EvalResult) {
        add_top_level_successors(point, node, result);
        if self.local.is_some() {
            add_mem_level_successors(point, node, StoreHandle::Local, result);
        }
    }

    fn pointer_for(&mut self, point: ProgramPoint, value: ValueId) -> PointerId {
        self.state.pointers.get_or_create(point.ctx, value)
    }
}

/// Wake the def-use successors of `node`
fn add_top_level_successors(point: ProgramPoint, node: &CfgNode, result: &mut EvalResult) {
    for &user in node.uses() {
        result.add_top_level(ProgramPoint::new(
            point.ctx,
            NodeRef::new(point.node.function, user),
        ));
    }
}

/// Send `store` to the memory-level successors of `node`
fn add_mem_level_successors(point: ProgramPoint, node: &CfgNode, store: StoreHandle, result: &mut EvalResult) {
    for &succ in node.succs() {
        result.add_mem_level(
            ProgramPoint::new(point.ctx, NodeRef::new(point.node.function, succ)),
            store,
        );
    }
}
