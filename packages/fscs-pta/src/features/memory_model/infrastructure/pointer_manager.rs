//! Pointer interning with value canonicalization

use rustc_hash::FxHashMap;

use crate::features::context::ContextId;
use crate::features::memory_model::domain::{Pointer, PointerId};
use crate::shared::models::{Program, ValueId, ValueKind};

/// Phi chains deeper than this are not collapsed
const MAX_PHI_DEPTH: usize = 8;

/// Interns `(context, value)` pairs.
///
/// Values are canonicalized first: casts are stripped, null and undef map to
/// the two special pointers, and a phi whose operands all canonicalize to the
/// same value collapses onto that value. Global values live in the global
/// context unless `preserve_global_contexts` is set.
#[derive(Debug, Clone)]
pub struct PointerManager<'p> {
    program: &'p Program,
    normalize_globals: bool,
    pointers: Vec<Pointer>,
    index: FxHashMap<Pointer, PointerId>,
    by_value: FxHashMap<ValueId, Vec<PointerId>>,
}

impl<'p> PointerManager<'p> {
    pub fn new(program: &'p Program, normalize_globals: bool) -> Self {
        let mut manager = Self {
            program,
            normalize_globals,
            pointers: Vec::new(),
            index: FxHashMap::default(),
            by_value: FxHashMap::default(),
        };
        manager.intern(Pointer {
            ctx: ContextId::GLOBAL,
            value: Program::UNDEF,
        });
        manager.intern(Pointer {
            ctx: ContextId::GLOBAL,
            value: Program::NULL,
        });
        manager
    }

    fn intern(&mut self, pointer: Pointer) -> PointerId {
        if let Some(&id) = self.index.get(&pointer) {
            return id;
        }
        let id = PointerId(self.pointers.len() as u32);
        self.pointers.push(pointer);
        self.index.insert(pointer, id);
        self.by_value.entry(pointer.value).or_default().push(id);
        id
    }

    /// Canonical representative of `value`
    pub fn canonicalize(&self, value: ValueId) -> ValueId {
        self.canonicalize_at(value, 0)
    }

    fn canonicalize_at(&self, value: ValueId, depth: usize) -> ValueId {
        let value = self.program.strip_casts(value);
        match &self.program.value(value).kind {
            ValueKind::Null => Program::NULL,
            ValueKind::Undef | ValueKind::IntToPtr => Program::UNDEF,
            ValueKind::Phi { incoming } if depth < MAX_PHI_DEPTH => {
                let mut canonical = incoming
                    .iter()
                    .map(|&v| self.canonicalize_at(v, depth + 1));
                match canonical.next() {
                    Some(first) if canonical.all(|v| v == first) => first,
                    _ => value,
                }
            }
            _ => value,
        }
    }

    fn context_for(&self, ctx: ContextId, value: ValueId) -> ContextId {
        if self.normalize_globals && self.program.value(value).is_global_value() {
            ContextId::GLOBAL
        } else {
            ctx
        }
    }

    pub fn get_or_create(&mut self, ctx: ContextId, value: ValueId) -> PointerId {
        let value = self.canonicalize(value);
        match value {
            Program::NULL => PointerId::NULL,
            Program::UNDEF => PointerId::UNIVERSAL,
            _ => {
                let ctx = self.context_for(ctx, value);
                self.intern(Pointer { ctx, value })
            }
        }
    }

    /// Existing pointer for `(ctx, value)`.
    ///
    /// With preserved global contexts a global value that was never bound
    /// under `ctx` falls back to its global-context pointer.
    pub fn get(&self, ctx: ContextId, value: ValueId) -> Option<PointerId> {
        let value = self.canonicalize(value);
        match value {
            Program::NULL => return Some(PointerId::NULL),
            Program::UNDEF => return Some(PointerId::UNIVERSAL),
            _ => {}
        }
        let ctx = self.context_for(ctx, value);
        let found = self.index.get(&Pointer { ctx, value }).copied();
        if found.is_none() && !ctx.is_global() && self.program.value(value).is_global_value() {
            return self
                .index
                .get(&Pointer {
                    ctx: ContextId::GLOBAL,
                    value,
                })
                .copied();
        }
        found
    }

    /// Every pointer created for `value` across contexts
    pub fn pointers_of_value(&self, value: ValueId) -> &[PointerId] {
        let value = self.canonicalize(value);
        self.by_value.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pointer(&self, id: PointerId) -> Pointer {
        self.pointers[id.index()]
    }

    pub fn normalizes_globals(&self) -> bool {
        self.normalize_globals
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointerId, Pointer)> + '_ {
        self.pointers
            .iter()
            .enumerate()
            .map(|(i, p)| (PointerId(i as u32), *p))
    }
}
