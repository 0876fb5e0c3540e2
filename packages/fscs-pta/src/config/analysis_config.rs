//! Analysis configuration model
//!
//! One switch selects the context policy; everything else tunes the run:
//!
//! ```rust,ignore
//! let config = AnalysisConfig::preset(Preset::Precise)
//!     .with_policy(
//!         ContextPolicyConfig::selective(1)
//!             .call_site("main", 4, 3)
//!             .pattern("^xmalloc$", 2)
//!             .into(),
//!     )
//!     .preserve_global_contexts(true)
//!     .max_iterations(1_000_000);
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound accepted for any configured call-string depth
pub const MAX_CONTEXT_DEPTH: usize = 16;

/// Named starting points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Context-insensitive
    Insensitive,
    /// 1-call-site sensitivity
    Balanced,
    /// 2-call-site sensitivity
    Precise,
}

/// A call or allocation site named by function and CFG node index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteRef {
    pub function: String,
    pub node: u32,
}

/// Site-specific depth bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLimit {
    pub function: String,
    pub node: u32,
    pub k: usize,
}

/// Depth bound for every call site inside a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionLimit {
    pub function: String,
    pub k: usize,
}

/// Depth bound for every call site whose callee name matches `pattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternLimit {
    pub pattern: String,
    pub k: usize,
}

/// Selective k-CFA settings
///
/// Precedence for a call site: explicit site, then enclosing function, then
/// the first matching callee pattern, then `default_k`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectiveKcfaConfig {
    #[serde(default)]
    pub default_k: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_sites: Vec<SiteLimit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alloc_sites: Vec<SiteLimit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionLimit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<PatternLimit>,
}

impl SelectiveKcfaConfig {
    pub fn call_site(mut self, function: &str, node: u32, k: usize) -> Self {
        self.call_sites.push(SiteLimit {
            function: function.to_string(),
            node,
            k,
        });
        self
    }

    pub fn alloc_site(mut self, function: &str, node: u32, k: usize) -> Self {
        self.alloc_sites.push(SiteLimit {
            function: function.to_string(),
            node,
            k,
        });
        self
    }

    pub fn function(mut self, function: &str, k: usize) -> Self {
        self.functions.push(FunctionLimit {
            function: function.to_string(),
            k,
        });
        self
    }

    pub fn pattern(mut self, pattern: &str, k: usize) -> Self {
        self.patterns.push(PatternLimit {
            pattern: pattern.to_string(),
            k,
        });
        self
    }

    /// Largest depth any call site may reach
    pub fn max_k(&self) -> usize {
        self.call_sites
            .iter()
            .map(|s| s.k)
            .chain(self.functions.iter().map(|f| f.k))
            .chain(self.patterns.iter().map(|p| p.k))
            .fold(self.default_k, usize::max)
    }
}

impl From<SelectiveKcfaConfig> for ContextPolicyConfig {
    fn from(config: SelectiveKcfaConfig) -> Self {
        ContextPolicyConfig::SelectiveKcfa(config)
    }
}

fn default_adaptive_depth() -> usize {
    8
}

/// Context policy switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextPolicyConfig {
    /// Context-insensitive
    None,
    /// Uniform call-string depth `k`
    UniformK { k: usize },
    /// Per-site depth bounds
    SelectiveKcfa(SelectiveKcfaConfig),
    /// Extend contexts only at tracked call sites
    Adaptive {
        #[serde(default)]
        tracked: Vec<SiteRef>,
        #[serde(default = "default_adaptive_depth")]
        max_depth: usize,
    },
}

impl ContextPolicyConfig {
    pub fn none() -> Self {
        Self::None
    }

    pub fn uniform(k: usize) -> Self {
        Self::UniformK { k }
    }

    pub fn selective(default_k: usize) -> SelectiveKcfaConfig {
        SelectiveKcfaConfig {
            default_k,
            ..Default::default()
        }
    }

    pub fn adaptive(tracked: Vec<SiteRef>) -> Self {
        Self::Adaptive {
            tracked,
            max_depth: default_adaptive_depth(),
        }
    }

    /// Whether every context the policy can produce is the global one
    pub fn is_insensitive(&self) -> bool {
        match self {
            Self::None | Self::UniformK { k: 0 } => true,
            Self::UniformK { .. } => false,
            Self::SelectiveKcfa(selective) => selective.max_k() == 0,
            Self::Adaptive { tracked, max_depth } => tracked.is_empty() || *max_depth == 0,
        }
    }
}

impl Default for ContextPolicyConfig {
    fn default() -> Self {
        Self::UniformK { k: 1 }
    }
}

/// Full analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub context_policy: ContextPolicyConfig,
    /// Keep global values context-qualified instead of folding them into the
    /// global context. Has no effect under a context-insensitive policy.
    pub preserve_global_contexts: bool,
    /// User effect table, merged over the built-in one
    pub external_table: Option<PathBuf>,
    pub entry_function: String,
    /// 0 = unlimited
    pub max_iterations: usize,
    /// 0 = unlimited
    pub time_budget_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl AnalysisConfig {
    pub fn preset(preset: Preset) -> Self {
        let context_policy = match preset {
            Preset::Insensitive => ContextPolicyConfig::None,
            Preset::Balanced => ContextPolicyConfig::UniformK { k: 1 },
            Preset::Precise => ContextPolicyConfig::UniformK { k: 2 },
        };
        Self {
            context_policy,
            preserve_global_contexts: false,
            external_table: None,
            entry_function: "main".to_string(),
            max_iterations: 0,
            time_budget_ms: 0,
        }
    }

    pub fn with_policy(mut self, policy: ContextPolicyConfig) -> Self {
        self.context_policy = policy;
        self
    }

    pub fn uniform_k(self, k: usize) -> Self {
        self.with_policy(ContextPolicyConfig::UniformK { k })
    }

    pub fn preserve_global_contexts(mut self, preserve: bool) -> Self {
        self.preserve_global_contexts = preserve;
        self
    }

    pub fn external_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.external_table = Some(path.into());
        self
    }

    pub fn entry_function(mut self, name: impl Into<String>) -> Self {
        self.entry_function = name.into();
        self
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn time_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(AnalysisConfig::preset(Preset::Insensitive)
            .context_policy
            .is_insensitive());
        assert_eq!(
            AnalysisConfig::preset(Preset::Precise).context_policy,
            ContextPolicyConfig::UniformK { k: 2 }
        );
        assert_eq!(AnalysisConfig::default().entry_function, "main");
    }

    #[test]
    fn test_builder_chain() {
        let config = AnalysisConfig::default()
            .uniform_k(3)
            .preserve_global_contexts(true)
            .external_table("effects.yaml")
            .max_iterations(10);
        assert_eq!(config.context_policy, ContextPolicyConfig::uniform(3));
        assert!(config.preserve_global_contexts);
        assert_eq!(config.external_table, Some(PathBuf::from("effects.yaml")));
        assert_eq!(config.max_iterations, 10);
    }

    #[test]
    fn test_selective_max_k() {
        let selective = ContextPolicyConfig::selective(1)
            .call_site("main", 3, 4)
            .function("helper", 2)
            .pattern("^util_", 0);
        assert_eq!(selective.max_k(), 4);
        assert!(!ContextPolicyConfig::from(selective).is_insensitive());
        assert!(ContextPolicyConfig::from(ContextPolicyConfig::selective(0)).is_insensitive());
    }

    #[test]
    fn test_adaptive_insensitive_without_tracked_sites() {
        assert!(ContextPolicyConfig::adaptive(Vec::new()).is_insensitive());
        let tracked = vec![SiteRef {
            function: "main".to_string(),
            node: 1,
        }];
        assert!(!ContextPolicyConfig::adaptive(tracked).is_insensitive());
    }
}
