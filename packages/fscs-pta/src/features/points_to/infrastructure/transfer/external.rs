//! Calls into external functions, modeled by their effect annotations

use tracing::trace;

use super::{add_mem_level_successors, add_top_level_successors, TransferFunction};
use crate::features::annotation::{CopyDest, CopySource, PointerEffect, Position};
use crate::features::context::{FunctionContext, ProgramPoint};
use crate::features::memory_model::MemoryObjectId;
use crate::features::points_to::domain::{Diagnostic, PtsSet, Store};
use crate::features::points_to::infrastructure::eval_result::{EvalResult, StoreHandle};
use crate::shared::models::{CfgNode, CfgNodeKind, TypeLayoutId, ValueId};

impl<'s, 'p> TransferFunction<'s, 'p> {
    pub(super) fn eval_external_call(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        fc: FunctionContext,
        local: &Store,
        result: &mut EvalResult,
    ) {
        let program = self.state.program;
        let name = &program.function(fc.function).name;
        let effects: Vec<PointerEffect> = match self.state.externals.lookup(name) {
            Some(effects) => effects.to_vec(),
            None => {
                self.state
                    .diagnostics
                    .report(Diagnostic::UnannotatedExternal { function: name.clone() });
                add_mem_level_successors(point, node, StoreHandle::Local, result);
                return;
            }
        };
        trace!(callee = %name, effects = effects.len(), "external call");

        let mut exits = false;
        for effect in &effects {
            match *effect {
                PointerEffect::Alloc { size } => self.eval_external_alloc(point, node, fc, size, result),
                PointerEffect::Copy { from, to } => self.eval_external_copy(point, node, from, to, local, result),
                PointerEffect::Exit => exits = true,
            }
        }

        if !exits {
            let store = result.current_store();
            add_mem_level_successors(point, node, store, result);
        }
    }

    fn eval_external_alloc(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        fc: FunctionContext,
        size: Option<Position>,
        result: &mut EvalResult,
    ) {
        let CfgNodeKind::Call {
            dest: Some(dest),
            alloc_hint,
            ..
        } = &node.kind
        else {
            return;
        };
        let program = self.state.program;

        let size = match size {
            None => None,
            Some(position) => match operand(node, position) {
                Some(value) => program.constant_int(value),
                None => {
                    let callee = program.function(fc.function).name.clone();
                    let position = match position {
                        Position::Arg(n) => n,
                        Position::Ret => 0,
                    };
                    self.state.diagnostics.report(Diagnostic::MissingSizeArgument {
                        site: point.node,
                        callee,
                        position,
                    });
                    None
                }
            },
        };
        let layout = self.heap_layout(*alloc_hint, size);

        // Heap objects are named in the callee's context
        let object = self.allocate(ProgramPoint::new(fc.ctx, point.node), *dest, layout, true);
        let pointer = self.pointer_for(point, *dest);
        if self.state.env.strong_update(pointer, PtsSet::singleton(object)) {
            add_top_level_successors(point, node, result);
        }
    }

    /// Layout of a heap block of `size` bytes allocated for `hint` elements
    fn heap_layout(&mut self, hint: Option<TypeLayoutId>, size: Option<u64>) -> TypeLayoutId {
        let layouts = self.state.memory.layouts_mut();
        let (Some(hint), Some(size)) = (hint, size) else {
            return layouts.byte_array();
        };
        let elem = layouts.get(hint).size;
        if elem == 0 || size == 0 || size % elem != 0 {
            layouts.byte_array()
        } else if size == elem {
            hint
        } else {
            layouts.array_of(hint, size / elem)
        }
    }

    fn eval_external_copy(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        from: CopySource,
        to: CopyDest,
        local: &Store,
        result: &mut EvalResult,
    ) {
        if let CopySource::ReachableMemory(src) = from {
            if let CopyDest::ReachableMemory(dst) = to {
                self.eval_memcpy(point, node, src, dst, local, result);
            }
            return;
        }

        let set = self.copy_source(point, node, from, local, result);
        if set.is_empty() {
            return;
        }

        let CfgNodeKind::Call { dest, .. } = &node.kind else {
            return;
        };
        if to.position().is_ret() && dest.is_none() {
            return;
        }
        let Some(value) = operand(node, to.position()) else {
            return;
        };

        match to {
            CopyDest::Value(_) => {
                let pointer = self.pointer_for(point, value);
                if self.state.env.weak_update(pointer, &set) {
                    add_top_level_successors(point, node, result);
                }
            }
            CopyDest::DirectMemory(_) => {
                let targets = self.state.value_pts(point.ctx, value).unwrap_or_default();
                if targets.is_empty() {
                    return;
                }
                let (_, store) = result.modified_store(local);
                for object in targets.iter() {
                    store.weak_update(object, &set);
                }
            }
            CopyDest::ReachableMemory(_) => {
                let targets = self.state.value_pts(point.ctx, value).unwrap_or_default();
                let mut fields = Vec::new();
                for object in targets.iter().filter(|o| !o.is_special()) {
                    fields.extend(self.state.memory.reachable_pointer_objects(object, true));
                }
                if fields.is_empty() {
                    return;
                }
                let (_, store) = result.modified_store(local);
                for object in fields {
                    store.weak_update(object, &set);
                }
            }
        }
    }

    fn copy_source(
        &self,
        point: ProgramPoint,
        node: &CfgNode,
        from: CopySource,
        local: &Store,
        result: &EvalResult,
    ) -> PtsSet {
        match from {
            CopySource::Null => PtsSet::null(),
            CopySource::Universal | CopySource::Static => PtsSet::universal(),
            CopySource::Value(position) => operand(node, position)
                .and_then(|value| self.state.value_pts(point.ctx, value))
                .unwrap_or_default(),
            CopySource::DirectMemory(position) => {
                let Some(targets) = operand(node, position).and_then(|value| self.state.value_pts(point.ctx, value))
                else {
                    return PtsSet::empty();
                };
                let store = current_store(result, local);
                let loaded: Vec<PtsSet> = targets.iter().map(|object| store.lookup(object)).collect();
                PtsSet::merge_all(&loaded)
            }
            CopySource::ReachableMemory(_) => PtsSet::empty(),
        }
    }

    /// `*[dst + x] = *[src + x]` for every pointer field reachable from the
    /// source objects, preserving the field offsets
    fn eval_memcpy(
        &mut self,
        point: ProgramPoint,
        node: &CfgNode,
        src: Position,
        dst: Position,
        local: &Store,
        result: &mut EvalResult,
    ) {
        let pts_of = |this: &Self, position: Position| {
            operand(node, position)
                .and_then(|value| this.state.value_pts(point.ctx, value))
                .unwrap_or_default()
        };
        let src_set = pts_of(self, src);
        let dst_set = pts_of(self, dst);
        if src_set.is_empty() || dst_set.is_empty() {
            return;
        }

        let mut updates: Vec<(MemoryObjectId, PtsSet)> = Vec::new();
        {
            let store = current_store(result, local);
            let memory = &mut self.state.memory;
            for src_obj in src_set.iter() {
                if src_obj.is_null() {
                    continue;
                }
                if src_obj.is_universal() {
                    for dst_obj in dst_set.iter().filter(|o| !o.is_special()) {
                        for target in memory.reachable_pointer_objects(dst_obj, true) {
                            updates.push((target, PtsSet::universal()));
                        }
                    }
                    continue;
                }

                let fields = memory.reachable_pointer_objects(src_obj, true);
                let base = memory.object(src_obj).offset;
                for dst_obj in dst_set.iter().filter(|o| !o.is_special()) {
                    for &field in &fields {
                        let set = store.lookup(field);
                        if set.is_empty() {
                            continue;
                        }
                        let Some(delta) = memory.object(field).offset.checked_sub(base) else {
                            continue;
                        };
                        let target = memory.offset_memory(dst_obj, delta);
                        // Past the end of the destination
                        if target.is_special() {
                            break;
                        }
                        updates.push((target, set));
                    }
                }
            }
        }

        if updates.is_empty() {
            return;
        }
        let (_, store) = result.modified_store(local);
        for (object, set) in updates {
            store.weak_update(object, &set);
        }
    }
}

/// The call operand at `position`
fn operand(node: &CfgNode, position: Position) -> Option<ValueId> {
    let CfgNodeKind::Call { dest, args, .. } = &node.kind else {
        return None;
    };
    match position {
        Position::Ret => *dest,
        Position::Arg(n) => args.get(n as usize).copied(),
    }
}

/// The store as modified so far by this evaluation
fn current_store<'a>(result: &'a EvalResult, local: &'a Store) -> &'a Store {
    result.store(result.current_store()).unwrap_or(local)
}
