//! Context-sensitive call graph

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::context::{ContextId, FunctionContext, ProgramPoint};
use crate::shared::models::NodeRef;

/// Edges `(caller context, call node) → (callee context, function)`
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    callees: FxHashMap<ProgramPoint, FxHashSet<FunctionContext>>,
    callers: FxHashMap<FunctionContext, Vec<ProgramPoint>>,
    /// Edges whose arguments have reached the callee's parameters
    bound: FxHashSet<(ProgramPoint, FunctionContext)>,
    edge_count: usize,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the edge is new
    pub fn insert_edge(&mut self, call: ProgramPoint, callee: FunctionContext) -> bool {
        if !self.callees.entry(call).or_default().insert(callee) {
            return false;
        }
        self.callers.entry(callee).or_default().push(call);
        self.edge_count += 1;
        true
    }

    /// Record that `call` bound its arguments into `callee`. Returns true
    /// the first time, when the callee's entry and returns must be revisited.
    pub fn mark_bound(&mut self, call: ProgramPoint, callee: FunctionContext) -> bool {
        self.bound.insert((call, callee))
    }

    /// Call points resolved to `callee`, in discovery order
    pub fn callers(&self, callee: FunctionContext) -> &[ProgramPoint] {
        self.callers.get(&callee).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn callees(&self, call: &ProgramPoint) -> impl Iterator<Item = FunctionContext> + '_ {
        self.callees.get(call).into_iter().flatten().copied()
    }

    /// Callees of `site`, in one caller context or across all of them
    pub fn callees_at(&self, site: NodeRef, ctx: Option<ContextId>) -> FxHashSet<FunctionContext> {
        match ctx {
            Some(ctx) => self.callees(&ProgramPoint::new(ctx, site)).collect(),
            None => self
                .callees
                .iter()
                .filter(|(point, _)| point.node == site)
                .flat_map(|(_, targets)| targets.iter().copied())
                .collect(),
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = (ProgramPoint, FunctionContext)> + '_ {
        self.callees
            .iter()
            .flat_map(|(call, targets)| targets.iter().map(move |t| (*call, *t)))
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{FunctionId, NodeId};

    #[test]
    fn test_insert_edge_reports_novelty() {
        let mut graph = CallGraph::new();
        let site = NodeRef::new(FunctionId(0), NodeId(3));
        let call = ProgramPoint::new(ContextId::GLOBAL, site);
        let target = FunctionContext::new(ContextId(1), FunctionId(2));

        assert!(graph.insert_edge(call, target));
        assert!(!graph.insert_edge(call, target));
        assert_eq!(graph.callers(target), &[call]);
        assert_eq!(graph.edge_count(), 1);

        let other = ProgramPoint::new(ContextId(4), site);
        graph.insert_edge(other, FunctionContext::new(ContextId(5), FunctionId(2)));
        assert_eq!(graph.callees_at(site, None).len(), 2);
        assert_eq!(graph.callees_at(site, Some(ContextId::GLOBAL)).len(), 1);
    }

    #[test]
    fn test_binding_is_reported_once_per_edge() {
        let mut graph = CallGraph::new();
        let call = ProgramPoint::new(ContextId::GLOBAL, NodeRef::new(FunctionId(0), NodeId(1)));
        let target = FunctionContext::new(ContextId::GLOBAL, FunctionId(2));

        graph.insert_edge(call, target);
        assert!(graph.mark_bound(call, target));
        assert!(!graph.mark_bound(call, target));

        let other = ProgramPoint::new(ContextId::GLOBAL, NodeRef::new(FunctionId(0), NodeId(2)));
        assert!(graph.mark_bound(other, target));
    }
}
