//! Calls: target resolution, context push, argument binding

use tracing::debug;

use super::{add_mem_level_successors, TransferFunction};
use crate::features::context::{FunctionContext, ProgramPoint};
use crate::features::points_to::domain::{Diagnostic, PtsSet, Store};
use crate::features::points_to::infrastructure::eval_result::{EvalResult, StoreHandle};
use crate::features::points_to::infrastructure::store_pruner::StorePruner;
use crate::shared::models::{CfgNode, CfgNodeKind, FunctionId, NodeRef, ValueId};

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_call(&mut self, point: ProgramPoint, node: &CfgNode, local: &Store, result: &mut EvalResult) {
        let CfgNodeKind::Call {
            dest, callee, args, ..
        } = &node.kind
        else {
            return;
        };
        let program = self.state.program;

        let Some(callee_set) = self.state.value_pts(point.ctx, *callee) else {
            return;
        };
        if callee_set.is_empty() {
            return;
        }

        let targets = self.resolve_callees(&callee_set, *dest, args);
        if targets.is_empty() {
            self.state
                .diagnostics
                .report(Diagnostic::UnresolvedIndirectCall { site: point.node });
            add_mem_level_successors(point, node, StoreHandle::Local, result);
            return;
        }

        // Only direct calls to real functions may extend the call string
        let direct = program.function_of_value(*callee).is_some();
        for target in targets {
            let function = program.function(target);
            let site = (direct && !function.intrinsic).then_some(point.node);
            let state = &mut *self.state;
            let callee_ctx = state.policy.push_context(&mut state.contexts, point.ctx, site);
            let fc = FunctionContext::new(callee_ctx, target);
            let new_edge = state.call_graph.insert_edge(point, fc);
            if new_edge {
                debug!(site = %point.node, callee = %function.name, ctx = %callee_ctx, "new call edge");
            }

            if function.is_declaration() {
                self.eval_external_call(point, node, fc, local, result);
            } else {
                self.eval_internal_call(point, node, fc, args, local, result);
            }
        }
    }

    /// Functions a callee points-to set may name. A universal target falls
    /// back to every address-taken function with a matching signature.
    fn resolve_callees(&self, callee_set: &PtsSet, dest: Option<ValueId>, args: &[ValueId]) -> Vec<FunctionId> {
        let program = self.state.program;
        if callee_set.contains_universal() {
            let pointer_args = program.pointer_args(args).count();
            let returns_pointer = dest.is_some_and(|d| program.is_pointer(d));
            return program
                .address_taken_functions()
                .filter(|f| f.is_var_arg || program.pointer_params(f.id).len() == pointer_args)
                .filter(|f| f.returns_pointer == returns_pointer)
                .map(|f| f.id)
                .collect();
        }

        let mut targets: Vec<FunctionId> = callee_set
            .iter()
            .filter_map(|object| self.state.memory.function_of(object))
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    fn eval_internal_call(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        fc: FunctionContext,
        args: &[ValueId],
        local: &Store,
        result: &mut EvalResult,
    ) {
        let program = self.state.program;
        let function = program.function(fc.function);
        let Some(cfg) = program.cfg(fc.function) else {
            return;
        };

        let params = program.pointer_params(fc.function);
        let pointer_args: Vec<ValueId> = program.pointer_args(args).collect();
        if pointer_args.len() < params.len() || (pointer_args.len() > params.len() && !function.is_var_arg) {
            self.state.diagnostics.report(Diagnostic::ArgumentCountMismatch {
                site: point.node,
                callee: function.name.clone(),
                params: params.len(),
                args: pointer_args.len(),
            });
        }

        let bound = params.len().min(pointer_args.len());
        let mut arg_sets = Vec::with_capacity(bound);
        for &arg in &pointer_args[..bound] {
            match self.state.value_pts(point.ctx, arg) {
                Some(set) if !set.is_empty() => arg_sets.push(set),
                // Wait until every argument has a target
                _ => return,
            }
        }

        let mut env_changed = false;
        for (&param, set) in params.iter().zip(&arg_sets) {
            let pointer = self.state.pointers.get_or_create(fc.ctx, param);
            env_changed |= self.state.env.weak_update(pointer, set);
        }

        // An edge found while arguments were pending counts as new here
        let first_binding = self.state.call_graph.mark_bound(point, fc);
        let entry = ProgramPoint::new(fc.ctx, NodeRef::new(fc.function, cfg.entry()));
        if env_changed || first_binding {
            result.add_top_level(entry);
        }
        if first_binding {
            // Already-evaluated returns must reach the new caller too
            for ret in cfg.nodes().filter(|n| matches!(n.kind, CfgNodeKind::Ret { .. })) {
                result.add_top_level(ProgramPoint::new(fc.ctx, NodeRef::new(fc.function, ret.id)));
            }
        }

        let pruned = StorePruner::new(&mut *self.state).prune(local, point.ctx, args);
        let handle = result.push_store(pruned);
        result.add_mem_level(entry, handle);

        if !cfg.does_not_return() {
            add_mem_level_successors(point, node, StoreHandle::Local, result);
        }
    }
}
