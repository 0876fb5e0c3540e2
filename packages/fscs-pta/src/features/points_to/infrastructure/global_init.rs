//! Global memory setup before the fixpoint starts

use tracing::debug;

use super::global_state::GlobalState;
use crate::features::context::ContextId;
use crate::features::memory_model::{MemoryObjectId, PointerId};
use crate::features::points_to::domain::{PtsSet, Store};
use crate::shared::models::{ValueId, ValueKind};

/// Binds every global variable and function to its object and seeds the
/// initial store from global initializers.
pub struct GlobalPointerAnalysis<'s, 'p> {
    state: &'s mut GlobalState<'p>,
}

impl<'s, 'p> GlobalPointerAnalysis<'s, 'p> {
    pub fn new(state: &'s mut GlobalState<'p>) -> Self {
        Self { state }
    }

    pub fn run(mut self) -> Store {
        let mut store = Store::new();
        self.state.env.strong_update(PointerId::UNIVERSAL, PtsSet::universal());
        self.state.env.strong_update(PointerId::NULL, PtsSet::null());
        store.insert(MemoryObjectId::UNIVERSAL, PtsSet::universal());

        self.allocate_globals();
        self.allocate_functions();
        self.initialize_globals(&mut store);

        debug!(
            globals = self.state.program.globals().len(),
            objects = self.state.memory.object_count(),
            store_entries = store.len(),
            "global memory initialized"
        );
        store
    }

    fn allocate_globals(&mut self) {
        let program = self.state.program;
        for global in program.globals() {
            let object = self.state.memory.allocate_global(global.value, global.layout);
            let pointer = self.state.pointers.get_or_create(ContextId::GLOBAL, global.value);
            self.state.env.strong_update(pointer, PtsSet::singleton(object));
        }
    }

    fn allocate_functions(&mut self) {
        let program = self.state.program;
        for function in program.functions() {
            let object = self.state.memory.allocate_function(function.id);
            let pointer = self.state.pointers.get_or_create(ContextId::GLOBAL, function.value);
            self.state.env.strong_update(pointer, PtsSet::singleton(object));
        }
    }

    fn initialize_globals(&mut self, store: &mut Store) {
        let program = self.state.program;
        for global in program.globals() {
            let Some(base) = self
                .state
                .pointers
                .get(ContextId::GLOBAL, global.value)
                .and_then(|p| self.state.env.lookup(p).single())
            else {
                continue;
            };

            for &(offset, init) in &global.initializers {
                let target = self.state.memory.offset_memory(base, offset);
                if target.is_special() {
                    continue;
                }
                if let Some(set) = self.initializer_pts(init) {
                    store.weak_update(target, &set);
                }
            }
        }
    }

    fn initializer_pts(&self, init: ValueId) -> Option<PtsSet> {
        let program = self.state.program;
        let value = program.strip_casts(init);
        match &program.value(value).kind {
            ValueKind::Null => Some(PtsSet::null()),
            ValueKind::Undef | ValueKind::IntToPtr => Some(PtsSet::universal()),
            ValueKind::Global | ValueKind::Function(_) => self
                .state
                .pointers
                .get(ContextId::GLOBAL, value)
                .map(|p| self.state.env.lookup(p)),
            ValueKind::ConstantInt(_) => None,
            _ => Some(PtsSet::universal()),
        }
    }
}
