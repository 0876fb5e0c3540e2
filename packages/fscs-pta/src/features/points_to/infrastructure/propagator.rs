//! Semi-sparse propagation of evaluation results
//!
//! Top-level successors are re-enqueued unconditionally. Memory-level
//! successors first merge their store into the memo and are enqueued only
//! when the memoized store grew.

use tracing::trace;

use super::eval_result::{EvalResult, StoreHandle};
use super::worklist::Worklist;
use crate::features::context::ProgramPoint;
use crate::features::points_to::domain::{Memo, Store};
use crate::shared::models::Program;

pub struct Propagator<'a> {
    program: &'a Program,
    memo: &'a mut Memo,
    worklist: &'a mut Worklist,
}

impl<'a> Propagator<'a> {
    pub fn new(program: &'a Program, memo: &'a mut Memo, worklist: &'a mut Worklist) -> Self {
        Self {
            program,
            memo,
            worklist,
        }
    }

    pub fn enqueue(&mut self, point: ProgramPoint) {
        let priority = self.program.node(point.node).map_or(u32::MAX, |n| n.priority());
        self.worklist.enqueue(point, priority);
    }

    /// Merge `store` into the memo at `point`; enqueue on change
    pub fn enqueue_if_memo_changed(&mut self, point: ProgramPoint, store: &Store) -> bool {
        if self.memo.update(point, store) {
            self.enqueue(point);
            true
        } else {
            false
        }
    }

    pub fn propagate(&mut self, result: &EvalResult, local: Option<&Store>) {
        let empty = Store::new();
        for successor in result.successors() {
            match successor.store {
                None => self.enqueue(successor.point),
                Some(handle) => {
                    let store = match handle {
                        StoreHandle::Local => local.unwrap_or(&empty),
                        StoreHandle::New(_) => result.store(handle).unwrap_or(&empty),
                    };
                    if self.enqueue_if_memo_changed(successor.point, store) {
                        trace!(point = %successor.point, "memory-level successor enqueued");
                    }
                }
            }
        }
    }
}
