//! Two-level worklist
//!
//! The outer queue schedules `(context, function)` pairs in FIFO order. Each
//! pair owns a local queue of CFG nodes ordered by the node priority computed
//! when the CFG was built (reverse post-order), so a function body is swept
//! roughly top to bottom before it is left.

use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::features::context::{FunctionContext, ProgramPoint};
use crate::shared::models::{NodeId, NodeRef};

#[derive(Debug, Default)]
struct LocalWorklist {
    heap: BinaryHeap<Reverse<(u32, NodeId)>>,
    queued: FxHashSet<NodeId>,
}

impl LocalWorklist {
    fn push(&mut self, node: NodeId, priority: u32) -> bool {
        if !self.queued.insert(node) {
            return false;
        }
        self.heap.push(Reverse((priority, node)));
        true
    }

    fn pop(&mut self) -> Option<NodeId> {
        let Reverse((_, node)) = self.heap.pop()?;
        self.queued.remove(&node);
        Some(node)
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[derive(Debug, Default)]
pub struct Worklist {
    functions: VecDeque<FunctionContext>,
    scheduled: FxHashSet<FunctionContext>,
    locals: FxHashMap<FunctionContext, LocalWorklist>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `point`; duplicates of an already queued point are dropped
    pub fn enqueue(&mut self, point: ProgramPoint, priority: u32) {
        let fc = point.function_context();
        self.locals.entry(fc).or_default().push(point.node.node, priority);
        if self.scheduled.insert(fc) {
            self.functions.push_back(fc);
        }
    }

    /// Next function context with pending nodes
    pub fn dequeue_function(&mut self) -> Option<FunctionContext> {
        while let Some(fc) = self.functions.pop_front() {
            self.scheduled.remove(&fc);
            if self.locals.get(&fc).is_some_and(|local| !local.is_empty()) {
                return Some(fc);
            }
        }
        None
    }

    /// Next pending node of `fc`, highest priority first
    pub fn dequeue_local(&mut self, fc: FunctionContext) -> Option<ProgramPoint> {
        let node = self.locals.get_mut(&fc)?.pop()?;
        Some(ProgramPoint::new(fc.ctx, NodeRef::new(fc.function, node)))
    }

    pub fn is_empty(&self) -> bool {
        self.locals.values().all(LocalWorklist::is_empty)
    }

    pub fn len(&self) -> usize {
        self.locals.values().map(LocalWorklist::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::context::ContextId;
    use crate::shared::models::FunctionId;

    fn point(ctx: u32, function: u32, node: u32) -> ProgramPoint {
        ProgramPoint::new(ContextId(ctx), NodeRef::new(FunctionId(function), NodeId(node)))
    }

    #[test]
    fn test_local_priority_order() {
        let mut worklist = Worklist::new();
        worklist.enqueue(point(0, 0, 7), 3);
        worklist.enqueue(point(0, 0, 2), 1);
        worklist.enqueue(point(0, 0, 5), 2);
        worklist.enqueue(point(0, 0, 2), 1);
        assert_eq!(worklist.len(), 3);

        let fc = worklist.dequeue_function().unwrap();
        let order: Vec<u32> = std::iter::from_fn(|| worklist.dequeue_local(fc))
            .map(|p| p.node.node.0)
            .collect();
        assert_eq!(order, vec![2, 5, 7]);
        assert!(worklist.is_empty());
        assert!(worklist.dequeue_function().is_none());
    }

    #[test]
    fn test_functions_are_fifo() {
        let mut worklist = Worklist::new();
        worklist.enqueue(point(1, 3, 0), 0);
        worklist.enqueue(point(0, 2, 0), 0);
        worklist.enqueue(point(1, 3, 4), 1);

        let first = worklist.dequeue_function().unwrap();
        assert_eq!(first, FunctionContext::new(ContextId(1), FunctionId(3)));
        while worklist.dequeue_local(first).is_some() {}

        let second = worklist.dequeue_function().unwrap();
        assert_eq!(second, FunctionContext::new(ContextId(0), FunctionId(2)));
    }

    #[test]
    fn test_requeue_while_draining() {
        let mut worklist = Worklist::new();
        worklist.enqueue(point(0, 0, 1), 1);
        let fc = worklist.dequeue_function().unwrap();
        assert!(worklist.dequeue_local(fc).is_some());
        worklist.enqueue(point(0, 0, 1), 1);
        assert_eq!(worklist.dequeue_function(), Some(fc));
        assert!(worklist.dequeue_local(fc).is_some());
    }
}
