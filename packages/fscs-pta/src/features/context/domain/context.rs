//! Interned call-string contexts
//!
//! A context is a linked list of call sites: each non-global context stores its
//! most recent call site and a handle to its predecessor. Contexts are interned
//! per `(predecessor, call site)`, so handle equality is structural equality.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::models::NodeRef;

/// Context handle (index into `ContextTable`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u32);

impl ContextId {
    /// The empty call string
    pub const GLOBAL: ContextId = ContextId(0);

    #[inline]
    pub fn is_global(self) -> bool {
        self == Self::GLOBAL
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// One call-string node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Context {
    pred: Option<ContextId>,
    call_site: Option<NodeRef>,
    depth: usize,
}

impl Context {
    pub fn pred(&self) -> Option<ContextId> {
        self.pred
    }

    pub fn call_site(&self) -> Option<NodeRef> {
        self.call_site
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Interning table shared by every policy
#[derive(Debug, Clone)]
pub struct ContextTable {
    contexts: Vec<Context>,
    index: FxHashMap<(ContextId, NodeRef), ContextId>,
}

impl ContextTable {
    pub fn new() -> Self {
        Self {
            contexts: vec![Context {
                pred: None,
                call_site: None,
                depth: 0,
            }],
            index: FxHashMap::default(),
        }
    }

    pub fn global(&self) -> ContextId {
        ContextId::GLOBAL
    }

    pub fn get(&self, ctx: ContextId) -> &Context {
        &self.contexts[ctx.index()]
    }

    pub fn depth(&self, ctx: ContextId) -> usize {
        self.get(ctx).depth
    }

    /// Extend `ctx` with `site`, reusing an existing context when possible
    pub fn push(&mut self, ctx: ContextId, site: NodeRef) -> ContextId {
        if let Some(&existing) = self.index.get(&(ctx, site)) {
            return existing;
        }
        let id = ContextId(self.contexts.len() as u32);
        let depth = self.depth(ctx) + 1;
        self.contexts.push(Context {
            pred: Some(ctx),
            call_site: Some(site),
            depth,
        });
        self.index.insert((ctx, site), id);
        id
    }

    /// Drop the most recent call site. The global context pops to itself.
    pub fn pop(&self, ctx: ContextId) -> ContextId {
        self.get(ctx).pred.unwrap_or(ContextId::GLOBAL)
    }

    /// Call sites of `ctx`, most recent first
    pub fn call_sites(&self, ctx: ContextId) -> Vec<NodeRef> {
        let mut sites = Vec::with_capacity(self.depth(ctx));
        let mut current = ctx;
        while let Some(site) = self.get(current).call_site {
            sites.push(site);
            current = self.pop(current);
        }
        sites
    }

    /// Keep only the `k` most recent call sites of `ctx`
    pub fn truncate(&mut self, ctx: ContextId, k: usize) -> ContextId {
        if self.depth(ctx) <= k {
            return ctx;
        }
        let kept: Vec<NodeRef> = self.call_sites(ctx).into_iter().take(k).collect();
        kept.into_iter()
            .rev()
            .fold(ContextId::GLOBAL, |acc, site| self.push(acc, site))
    }

    pub fn all_contexts(&self) -> impl Iterator<Item = ContextId> {
        (0..self.contexts.len() as u32).map(ContextId)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Render a context as `[site, site, ...]`, outermost call first
    pub fn describe(&self, ctx: ContextId) -> String {
        let mut sites = self.call_sites(ctx);
        sites.reverse();
        let parts: Vec<String> = sites.iter().map(|s| s.to_string()).collect();
        format!("[{}]", parts.join(", "))
    }
}

impl Default for ContextTable {
    fn default() -> Self {
        Self::new()
    }
}
