//! Configuration validation

use regex::Regex;

use super::analysis_config::{AnalysisConfig, ContextPolicyConfig, MAX_CONTEXT_DEPTH};
use super::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration objects
pub trait Validatable {
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

fn check_depth(field: &str, k: usize) -> ConfigResult<()> {
    if k > MAX_CONTEXT_DEPTH {
        return Err(ConfigError::range_with_hint(
            field,
            k,
            0,
            MAX_CONTEXT_DEPTH,
            "Deep call strings explode the context space; use selective k-CFA for targeted precision",
        ));
    }
    Ok(())
}

impl Validatable for ContextPolicyConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            ContextPolicyConfig::None => Ok(()),
            ContextPolicyConfig::UniformK { k } => check_depth("k", *k),
            ContextPolicyConfig::SelectiveKcfa(selective) => {
                check_depth("default_k", selective.default_k)?;
                for site in selective.call_sites.iter().chain(&selective.alloc_sites) {
                    check_depth(&format!("{}#{}", site.function, site.node), site.k)?;
                }
                for function in &selective.functions {
                    check_depth(&function.function, function.k)?;
                }
                for pattern in &selective.patterns {
                    check_depth(&pattern.pattern, pattern.k)?;
                    Regex::new(&pattern.pattern).map_err(|e| ConfigError::InvalidPattern {
                        pattern: pattern.pattern.clone(),
                        reason: e.to_string(),
                    })?;
                }
                Ok(())
            }
            ContextPolicyConfig::Adaptive { max_depth, .. } => check_depth("max_depth", *max_depth),
        }
    }

    fn config_name(&self) -> &'static str {
        "ContextPolicyConfig"
    }
}

impl Validatable for AnalysisConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.context_policy.validate()?;
        if self.entry_function.trim().is_empty() {
            return Err(ConfigError::Validation(
                "entry_function must name a function".to_string(),
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "AnalysisConfig"
    }
}
