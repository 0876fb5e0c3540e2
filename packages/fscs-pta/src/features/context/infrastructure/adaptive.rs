//! Adaptive contexts: extend only at explicitly tracked call sites

use rustc_hash::FxHashSet;

use crate::features::context::domain::{ContextId, ContextPolicy, ContextTable};
use crate::shared::models::NodeRef;

/// Pushes a call site only if it is tracked, up to `max_depth`
#[derive(Debug, Clone, Default)]
pub struct AdaptiveContext {
    tracked: FxHashSet<NodeRef>,
    max_depth: usize,
}

impl AdaptiveContext {
    pub fn new(tracked: impl IntoIterator<Item = NodeRef>, max_depth: usize) -> Self {
        Self {
            tracked: tracked.into_iter().collect(),
            max_depth,
        }
    }

    pub fn track(&mut self, site: NodeRef) {
        self.tracked.insert(site);
    }

    pub fn is_tracked(&self, site: NodeRef) -> bool {
        self.tracked.contains(&site)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

impl ContextPolicy for AdaptiveContext {
    fn push_context(&self, table: &mut ContextTable, caller: ContextId, site: NodeRef) -> ContextId {
        if !self.is_tracked(site) || table.depth(caller) >= self.max_depth {
            return caller;
        }
        table.push(caller, site)
    }

    fn is_insensitive(&self) -> bool {
        self.tracked.is_empty() || self.max_depth == 0
    }

    fn name(&self) -> &'static str {
        "adaptive"
    }
}
