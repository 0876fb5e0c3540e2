//! Context policy port

use std::fmt::Debug;

use super::context::{ContextId, ContextTable};
use crate::shared::models::NodeRef;

/// Decides the callee context at a call site
///
/// Policies are stateless with respect to contexts: every context they create
/// lives in the shared `ContextTable`.
pub trait ContextPolicy: Debug + Send + Sync {
    /// Context for a callee entered from `caller` through `site`
    fn push_context(&self, table: &mut ContextTable, caller: ContextId, site: NodeRef) -> ContextId;

    /// Context recorded on objects allocated at `site` while in `ctx`
    fn alloc_context(&self, _table: &mut ContextTable, ctx: ContextId, _site: NodeRef) -> ContextId {
        ctx
    }

    /// True when the policy can only ever produce the global context
    fn is_insensitive(&self) -> bool;

    fn name(&self) -> &'static str;
}
