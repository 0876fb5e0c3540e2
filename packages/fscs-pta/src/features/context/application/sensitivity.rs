//! The configured context policy
//!
//! Exactly one policy is active per analysis run. Contexts do not record which
//! policy produced them; they all live in the same `ContextTable`.

use crate::config::{ConfigResult, ContextPolicyConfig};
use crate::features::context::domain::{ContextId, ContextPolicy, ContextTable};
use crate::features::context::infrastructure::selective_kcfa::{resolve_site, SiteKind};
use crate::features::context::infrastructure::{AdaptiveContext, KLimitContext, SelectiveKcfa};
use crate::shared::models::{NodeRef, Program};

#[derive(Debug, Clone)]
pub enum ContextSensitivity {
    KLimit(KLimitContext),
    Selective(SelectiveKcfa),
    Adaptive(AdaptiveContext),
}

impl ContextSensitivity {
    pub fn insensitive() -> Self {
        Self::KLimit(KLimitContext::new(0))
    }

    pub fn k_limit(k: usize) -> Self {
        Self::KLimit(KLimitContext::new(k))
    }

    /// Resolve a policy configuration against `program`
    pub fn from_config(config: &ContextPolicyConfig, program: &Program) -> ConfigResult<Self> {
        Ok(match config {
            ContextPolicyConfig::None => Self::insensitive(),
            ContextPolicyConfig::UniformK { k } => Self::k_limit(*k),
            ContextPolicyConfig::SelectiveKcfa(selective) => {
                Self::Selective(SelectiveKcfa::from_config(selective, program)?)
            }
            ContextPolicyConfig::Adaptive { tracked, max_depth } => {
                let sites = tracked
                    .iter()
                    .map(|site| resolve_site(program, &site.function, site.node, SiteKind::Call))
                    .collect::<ConfigResult<Vec<_>>>()?;
                Self::Adaptive(AdaptiveContext::new(sites, *max_depth))
            }
        })
    }

    fn policy(&self) -> &dyn ContextPolicy {
        match self {
            Self::KLimit(p) => p,
            Self::Selective(p) => p,
            Self::Adaptive(p) => p,
        }
    }

    /// Callee context. `site` is `None` for calls that may not extend a
    /// context (indirect calls, intrinsics); those share the caller's context.
    pub fn push_context(
        &self,
        table: &mut ContextTable,
        caller: ContextId,
        site: Option<NodeRef>,
    ) -> ContextId {
        match site {
            Some(site) => self.policy().push_context(table, caller, site),
            None => caller,
        }
    }

    pub fn alloc_context(&self, table: &mut ContextTable, ctx: ContextId, site: NodeRef) -> ContextId {
        self.policy().alloc_context(table, ctx, site)
    }

    pub fn is_insensitive(&self) -> bool {
        self.policy().is_insensitive()
    }

    pub fn name(&self) -> &'static str {
        self.policy().name()
    }
}

impl Default for ContextSensitivity {
    fn default() -> Self {
        Self::k_limit(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteRef;
    use crate::shared::models::{FunctionId, NodeId, ProgramBuilder};

    fn program() -> Program {
        let mut b = ProgramBuilder::new();
        let main = b.declare_function("main", &[], false);
        let f = b.declare_function("f", &[], false);
        let fv = b.function_value(f);
        let mut body = b.body(main);
        body.call(None, fv, &[]);
        body.ret(None);
        b.define(main, body);
        b.build().unwrap()
    }

    #[test]
    fn test_ineligible_site_keeps_caller() {
        let mut table = ContextTable::new();
        let policy = ContextSensitivity::k_limit(3);
        let c1 = policy.push_context(
            &mut table,
            ContextId::GLOBAL,
            Some(NodeRef::new(FunctionId(0), NodeId(1))),
        );
        assert_eq!(policy.push_context(&mut table, c1, None), c1);
    }

    #[test]
    fn test_from_config() {
        let program = program();
        let policy = ContextSensitivity::from_config(&ContextPolicyConfig::None, &program).unwrap();
        assert!(policy.is_insensitive());
        assert_eq!(policy.name(), "uniform-k");

        let adaptive = ContextPolicyConfig::adaptive(vec![SiteRef {
            function: "main".to_string(),
            node: 1,
        }]);
        let policy = ContextSensitivity::from_config(&adaptive, &program).unwrap();
        assert!(!policy.is_insensitive());
        assert_eq!(policy.name(), "adaptive");

        let bad = ContextPolicyConfig::adaptive(vec![SiteRef {
            function: "main".to_string(),
            node: 7,
        }]);
        assert!(ContextSensitivity::from_config(&bad, &program).is_err());
    }
}
