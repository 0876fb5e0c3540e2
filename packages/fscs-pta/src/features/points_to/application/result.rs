//! Converged analysis state and statistics

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::analyzer::Termination;
use crate::features::annotation::ExternalPointerTable;
use crate::features::context::{ContextId, ContextTable, ProgramPoint};
use crate::features::memory_model::{MemoryManager, MemoryObjectId, Pointer, PointerId};
use crate::features::points_to::domain::{CallGraph, Diagnostic, Memo, PtsSet, Store};
use crate::features::points_to::infrastructure::GlobalState;
use crate::features::points_to::ports::{sets_may_alias, PointsToQueries};
use crate::shared::models::{FunctionId, NodeRef, Program, ValueId};

/// Run statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub policy: String,
    pub termination: Termination,
    /// Transfer function evaluations
    pub iterations: usize,
    /// Program points that received a store
    pub program_points: usize,
    pub contexts: usize,
    pub pointers: usize,
    pub memory_objects: usize,
    pub env_entries: usize,
    pub call_graph_edges: usize,
    pub diagnostics: usize,
    pub elapsed_ms: u64,
}

impl AnalysisStats {
    pub(crate) fn collect(
        state: &GlobalState<'_>,
        memo: &Memo,
        iterations: usize,
        elapsed: Duration,
        termination: Termination,
    ) -> Self {
        Self {
            policy: state.policy.name().to_string(),
            termination,
            iterations,
            program_points: memo.len(),
            contexts: state.contexts.len(),
            pointers: state.pointers.len(),
            memory_objects: state.memory.object_count(),
            env_entries: state.env.len(),
            call_graph_edges: state.call_graph.edge_count(),
            diagnostics: state.diagnostics.len(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// JSON report
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of one analysis run, borrowing the analyzed program
#[derive(Debug)]
pub struct PointsToResult<'p> {
    state: GlobalState<'p>,
    memo: Memo,
    stats: AnalysisStats,
    diagnostics: Vec<Diagnostic>,
}

impl<'p> PointsToResult<'p> {
    pub(crate) fn new(mut state: GlobalState<'p>, memo: Memo, stats: AnalysisStats) -> Self {
        let diagnostics = std::mem::take(&mut state.diagnostics).into_entries();
        Self {
            state,
            memo,
            stats,
            diagnostics,
        }
    }

    pub fn program(&self) -> &'p Program {
        self.state.program
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    pub fn termination(&self) -> Termination {
        self.stats.termination
    }

    /// True when the fixpoint was reached rather than interrupted
    pub fn converged(&self) -> bool {
        self.stats.termination == Termination::Converged
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.state.contexts
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.state.call_graph
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.state.memory
    }

    /// Effect table the run interpreted external calls with
    pub fn externals(&self) -> &ExternalPointerTable {
        &self.state.externals
    }

    /// Store reaching `point`, if any did
    pub fn store_at(&self, point: &ProgramPoint) -> Option<&Store> {
        self.memo.lookup(point)
    }

    /// What `object` may hold at any program point
    pub fn object_points_to(&self, object: MemoryObjectId) -> PtsSet {
        let sets: Vec<PtsSet> = self.memo.iter().map(|(_, store)| store.lookup(object)).collect();
        PtsSet::merge_all(&sets)
    }

    /// Single object `value` points to in the global context, e.g. a
    /// global variable's own object
    pub fn object_of(&self, value: ValueId) -> Option<MemoryObjectId> {
        self.points_to(Some(ContextId::GLOBAL), value).single()
    }
}

impl<'p> PointsToQueries for PointsToResult<'p> {
    fn points_to(&self, ctx: Option<ContextId>, value: ValueId) -> PtsSet {
        match ctx {
            Some(ctx) => self.state.value_pts(ctx, value).unwrap_or_default(),
            None => self.state.value_pts_any_context(value),
        }
    }

    fn pointer(&self, ctx: ContextId, value: ValueId) -> Option<PointerId> {
        self.state.pointers.get(ctx, value)
    }

    fn pointer_value(&self, pointer: PointerId) -> Pointer {
        self.state.pointers.pointer(pointer)
    }

    fn pointer_pts(&self, pointer: PointerId) -> PtsSet {
        self.state.env.lookup(pointer)
    }

    fn callees(&self, site: NodeRef, ctx: Option<ContextId>) -> Vec<FunctionId> {
        let mut callees: Vec<FunctionId> = self
            .state
            .call_graph
            .callees_at(site, ctx)
            .into_iter()
            .map(|fc| fc.function)
            .collect();
        callees.sort_unstable();
        callees.dedup();
        callees
    }

    fn pointed_by(&self, object: MemoryObjectId) -> Vec<PointerId> {
        let mut pointers: Vec<PointerId> = self
            .state
            .env
            .iter()
            .filter(|(pointer, set)| !is_special_pointer(*pointer) && set.has(object))
            .map(|(pointer, _)| pointer)
            .collect();
        pointers.sort_unstable();
        pointers
    }

    fn alias_set(&self, pointer: PointerId) -> Vec<PointerId> {
        let target = self.state.env.lookup(pointer);
        let mut aliases: Vec<PointerId> = self
            .state
            .env
            .iter()
            .filter(|(other, _)| *other != pointer && !is_special_pointer(*other))
            .filter(|(_, set)| sets_may_alias(&target, set))
            .map(|(other, _)| other)
            .collect();
        aliases.sort_unstable();
        aliases
    }
}

fn is_special_pointer(pointer: PointerId) -> bool {
    pointer == PointerId::UNIVERSAL || pointer == PointerId::NULL
}
