//! Shared analysis state threaded through every transfer function

use rustc_hash::FxHashSet;

use crate::features::annotation::ExternalPointerTable;
use crate::features::context::{ContextId, ContextSensitivity, ContextTable};
use crate::features::memory_model::{MemoryManager, PointerId, PointerManager};
use crate::features::points_to::domain::{CallGraph, Diagnostics, Env, PtsSet};
use crate::shared::models::{Program, ValueId, ValueKind};

/// Everything a transfer function may read or write besides the local store
#[derive(Debug)]
pub struct GlobalState<'p> {
    pub(crate) program: &'p Program,
    pub(crate) contexts: ContextTable,
    pub(crate) policy: ContextSensitivity,
    pub(crate) pointers: PointerManager<'p>,
    pub(crate) memory: MemoryManager,
    pub(crate) env: Env,
    pub(crate) call_graph: CallGraph,
    pub(crate) externals: ExternalPointerTable,
    pub(crate) diagnostics: Diagnostics,
}

impl<'p> GlobalState<'p> {
    pub fn new(
        program: &'p Program,
        policy: ContextSensitivity,
        externals: ExternalPointerTable,
        normalize_globals: bool,
    ) -> Self {
        Self {
            program,
            contexts: ContextTable::new(),
            policy,
            pointers: PointerManager::new(program, normalize_globals),
            memory: MemoryManager::new(program.layouts().clone()),
            env: Env::new(),
            call_graph: CallGraph::new(),
            externals,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.contexts
    }

    pub fn pointers(&self) -> &PointerManager<'p> {
        &self.pointers
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    /// Values a use of `value` reads from: the canonical value, or the
    /// incoming values of a phi that does not collapse.
    pub(crate) fn value_roots(&self, value: ValueId) -> Vec<ValueId> {
        let mut roots = Vec::new();
        let mut visited: FxHashSet<ValueId> = FxHashSet::default();
        let mut stack = vec![value];
        while let Some(v) = stack.pop() {
            let canonical = self.pointers.canonicalize(v);
            if !visited.insert(canonical) {
                continue;
            }
            match &self.program.value(canonical).kind {
                ValueKind::Phi { incoming } => stack.extend(incoming.iter().copied()),
                _ => roots.push(canonical),
            }
        }
        roots
    }

    /// Points-to set of `value` under `ctx`, or `None` when no pointer for
    /// it exists yet
    pub(crate) fn value_pts(&self, ctx: ContextId, value: ValueId) -> Option<PtsSet> {
        let mut found = false;
        let mut sets = Vec::new();
        for root in self.value_roots(value) {
            if let Some(pointer) = self.pointers.get(ctx, root) {
                found = true;
                sets.push(self.env.lookup(pointer));
            }
        }
        found.then(|| PtsSet::merge_all(&sets))
    }

    /// Union of the points-to sets of `value` across every context
    pub(crate) fn value_pts_any_context(&self, value: ValueId) -> PtsSet {
        let mut sets = Vec::new();
        for root in self.value_roots(value) {
            match root {
                Program::NULL => sets.push(self.env.lookup(PointerId::NULL)),
                Program::UNDEF => sets.push(self.env.lookup(PointerId::UNIVERSAL)),
                _ => sets.extend(
                    self.pointers
                        .pointers_of_value(root)
                        .iter()
                        .map(|&p| self.env.lookup(p)),
                ),
            }
        }
        PtsSet::merge_all(&sets)
    }
}
