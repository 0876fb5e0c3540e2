//! Selective k-CFA: per-call-site and per-allocation-site depth bounds
//!
//! Call sites without an explicit bound use `default_k`. Allocation sites with a
//! bound record only the `k` most recent call sites on the objects they create,
//! independently of how deep the surrounding context is.

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{ConfigError, ConfigResult, SelectiveKcfaConfig};
use crate::features::context::domain::{ContextId, ContextPolicy, ContextTable};
use crate::shared::models::{CfgNodeKind, NodeId, NodeRef, Program};

#[derive(Debug, Clone, Default)]
pub struct SelectiveKcfa {
    default_k: usize,
    call_site_limits: FxHashMap<NodeRef, usize>,
    alloc_site_limits: FxHashMap<NodeRef, usize>,
}

/// Summary of the configured bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectiveStats {
    pub default_k: usize,
    pub call_sites: usize,
    pub alloc_sites: usize,
    /// k -> number of call sites configured with it
    pub call_site_histogram: BTreeMap<usize, usize>,
}

impl SelectiveKcfa {
    pub fn new(default_k: usize) -> Self {
        Self {
            default_k,
            ..Default::default()
        }
    }

    pub fn default_limit(&self) -> usize {
        self.default_k
    }

    pub fn set_call_site_limit(&mut self, site: NodeRef, k: usize) {
        self.call_site_limits.insert(site, k);
    }

    pub fn set_alloc_site_limit(&mut self, site: NodeRef, k: usize) {
        self.alloc_site_limits.insert(site, k);
    }

    pub fn call_site_limit(&self, site: NodeRef) -> usize {
        self.call_site_limits
            .get(&site)
            .copied()
            .unwrap_or(self.default_k)
    }

    pub fn alloc_site_limit(&self, site: NodeRef) -> Option<usize> {
        self.alloc_site_limits.get(&site).copied()
    }

    /// Bound every call site inside `function`. Returns how many were set.
    pub fn limit_call_sites_in(&mut self, program: &Program, function: &str, k: usize) -> ConfigResult<usize> {
        let id = program
            .function_by_name(function)
            .ok_or_else(|| unknown_function(program, function))?;
        let sites: Vec<NodeRef> = program
            .call_sites()
            .filter(|(site, _)| site.function == id)
            .map(|(site, _)| site)
            .collect();
        for &site in &sites {
            self.set_call_site_limit(site, k);
        }
        Ok(sites.len())
    }

    /// Bound every direct call site whose callee name matches `pattern`.
    /// Sites that already carry a bound keep it unless `overwrite` is set.
    pub fn limit_call_sites_by_callee(
        &mut self,
        program: &Program,
        pattern: &Regex,
        k: usize,
        overwrite: bool,
    ) -> usize {
        let mut count = 0;
        for (site, node) in program.call_sites() {
            let CfgNodeKind::Call { callee, .. } = &node.kind else {
                continue;
            };
            let Some(target) = program.function_of_value(*callee) else {
                continue;
            };
            if !pattern.is_match(&program.function(target).name) {
                continue;
            }
            if overwrite || !self.call_site_limits.contains_key(&site) {
                self.set_call_site_limit(site, k);
                count += 1;
            }
        }
        count
    }

    /// Resolve a configuration against a program.
    ///
    /// Explicit sites win over function-wide bounds, which win over callee
    /// patterns (first matching pattern wins).
    pub fn from_config(config: &SelectiveKcfaConfig, program: &Program) -> ConfigResult<Self> {
        let mut policy = Self::new(config.default_k);

        for limit in &config.patterns {
            let pattern = Regex::new(&limit.pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: limit.pattern.clone(),
                reason: e.to_string(),
            })?;
            let count = policy.limit_call_sites_by_callee(program, &pattern, limit.k, false);
            debug!(pattern = %limit.pattern, k = limit.k, count, "bounded call sites by callee pattern");
        }
        for limit in &config.functions {
            let count = policy.limit_call_sites_in(program, &limit.function, limit.k)?;
            debug!(function = %limit.function, k = limit.k, count, "bounded call sites in function");
        }
        for limit in &config.call_sites {
            let site = resolve_site(program, &limit.function, limit.node, SiteKind::Call)?;
            policy.set_call_site_limit(site, limit.k);
        }
        for limit in &config.alloc_sites {
            let site = resolve_site(program, &limit.function, limit.node, SiteKind::Allocation)?;
            policy.set_alloc_site_limit(site, limit.k);
        }
        Ok(policy)
    }

    pub fn stats(&self) -> SelectiveStats {
        let mut call_site_histogram = BTreeMap::new();
        for &k in self.call_site_limits.values() {
            *call_site_histogram.entry(k).or_insert(0) += 1;
        }
        SelectiveStats {
            default_k: self.default_k,
            call_sites: self.call_site_limits.len(),
            alloc_sites: self.alloc_site_limits.len(),
            call_site_histogram,
        }
    }
}

impl ContextPolicy for SelectiveKcfa {
    fn push_context(&self, table: &mut ContextTable, caller: ContextId, site: NodeRef) -> ContextId {
        if table.depth(caller) >= self.call_site_limit(site) {
            return caller;
        }
        table.push(caller, site)
    }

    fn alloc_context(&self, table: &mut ContextTable, ctx: ContextId, site: NodeRef) -> ContextId {
        match self.alloc_site_limit(site) {
            Some(k) => table.truncate(ctx, k),
            None => ctx,
        }
    }

    fn is_insensitive(&self) -> bool {
        self.default_k == 0 && self.call_site_limits.values().all(|&k| k == 0)
    }

    fn name(&self) -> &'static str {
        "selective-kcfa"
    }
}

/// What a configured site must be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SiteKind {
    Call,
    Allocation,
}

impl SiteKind {
    fn accepts(self, kind: &CfgNodeKind) -> bool {
        match self {
            SiteKind::Call => matches!(kind, CfgNodeKind::Call { .. }),
            SiteKind::Allocation => {
                matches!(kind, CfgNodeKind::Alloc { .. } | CfgNodeKind::Call { .. })
            }
        }
    }

    fn label(self) -> &'static str {
        match self {
            SiteKind::Call => "call",
            SiteKind::Allocation => "allocation",
        }
    }
}

fn unknown_function(program: &Program, function: &str) -> ConfigError {
    ConfigError::unknown_function(function, program.functions().map(|f| f.name.as_str()))
}

/// Turn a `(function name, node index)` pair into a site handle
pub(crate) fn resolve_site(
    program: &Program,
    function: &str,
    node: u32,
    kind: SiteKind,
) -> ConfigResult<NodeRef> {
    let id = program
        .function_by_name(function)
        .ok_or_else(|| unknown_function(program, function))?;
    let site = NodeRef::new(id, NodeId(node));
    match program.node(site) {
        Some(n) if kind.accepts(&n.kind) => Ok(site),
        _ => Err(ConfigError::UnknownSite {
            function: function.to_string(),
            node,
            expected: kind.label(),
        }),
    }
}
