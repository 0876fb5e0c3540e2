//! Uniform k-limited call strings

use tracing::trace;

use crate::features::context::domain::{ContextId, ContextPolicy, ContextTable};
use crate::shared::models::NodeRef;

/// k-CFA with one global bound. `k = 0` is context-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KLimitContext {
    k: usize,
}

impl KLimitContext {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn limit(&self) -> usize {
        self.k
    }
}

impl ContextPolicy for KLimitContext {
    fn push_context(&self, table: &mut ContextTable, caller: ContextId, site: NodeRef) -> ContextId {
        if self.k == 0 {
            return ContextId::GLOBAL;
        }
        if table.depth(caller) >= self.k {
            trace!(%caller, %site, k = self.k, "context depth bound reached");
            return caller;
        }
        table.push(caller, site)
    }

    fn is_insensitive(&self) -> bool {
        self.k == 0
    }

    fn name(&self) -> &'static str {
        "uniform-k"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{FunctionId, NodeId};

    fn site(n: u32) -> NodeRef {
        NodeRef::new(FunctionId(0), NodeId(n))
    }

    #[test]
    fn test_k_zero_is_global() {
        let mut table = ContextTable::new();
        let policy = KLimitContext::new(0);
        let pushed = policy.push_context(&mut table, ContextId::GLOBAL, site(1));
        assert_eq!(pushed, ContextId::GLOBAL);
        assert!(policy.is_insensitive());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_push_until_bound() {
        let mut table = ContextTable::new();
        let policy = KLimitContext::new(2);
        let c1 = policy.push_context(&mut table, ContextId::GLOBAL, site(1));
        let c2 = policy.push_context(&mut table, c1, site(2));
        assert_eq!(table.depth(c2), 2);

        // At the bound the caller's context is returned unchanged
        let c3 = policy.push_context(&mut table, c2, site(3));
        let c4 = policy.push_context(&mut table, c3, site(4));
        assert_eq!(c3, c2);
        assert_eq!(c4, c2);
    }

    #[test]
    fn test_distinct_sites_distinct_contexts() {
        let mut table = ContextTable::new();
        let policy = KLimitContext::new(1);
        let a = policy.push_context(&mut table, ContextId::GLOBAL, site(1));
        let b = policy.push_context(&mut table, ContextId::GLOBAL, site(2));
        assert_ne!(a, b);
        assert_eq!(policy.push_context(&mut table, ContextId::GLOBAL, site(1)), a);
    }
}
