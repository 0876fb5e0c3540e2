//! Entry point seeding

use tracing::debug;

use super::global_state::GlobalState;
use super::propagator::Propagator;
use crate::errors::{FscsError, Result};
use crate::features::context::{ContextId, ProgramPoint};
use crate::features::points_to::domain::{PtsSet, Store};
use crate::shared::models::NodeRef;

/// Startup parameters of the entry function (`argv`, `envp`)
const STARTUP_PARAMS: [usize; 2] = [1, 2];

pub struct Initializer<'s, 'p> {
    state: &'s mut GlobalState<'p>,
}

impl<'s, 'p> Initializer<'s, 'p> {
    pub fn new(state: &'s mut GlobalState<'p>) -> Self {
        Self { state }
    }

    /// Bind startup memory and enqueue the entry node of `entry` with `store`
    pub fn seed(self, entry: &str, mut store: Store, propagator: &mut Propagator<'_>) -> Result<ProgramPoint> {
        let program = self.state.program;
        let function = program
            .function_by_name(entry)
            .ok_or_else(|| FscsError::UnknownEntry(entry.to_string()))?;
        let cfg = program
            .cfg(function)
            .ok_or_else(|| FscsError::UnknownEntry(entry.to_string()))?;

        let params = &program.function(function).params;
        for index in STARTUP_PARAMS {
            let Some(&param) = params.get(index) else {
                break;
            };
            if !program.is_pointer(param) {
                continue;
            }
            let object = self.state.memory.allocate_startup(param);
            let pointer = self.state.pointers.get_or_create(ContextId::GLOBAL, param);
            let set = PtsSet::singleton(object);
            self.state.env.strong_update(pointer, set.clone());
            store.weak_update(object, &set);
        }

        let point = ProgramPoint::new(ContextId::GLOBAL, NodeRef::new(function, cfg.entry()));
        propagator.enqueue_if_memo_changed(point, &store);
        debug!(entry, point = %point, "analysis seeded");
        Ok(point)
    }
}
