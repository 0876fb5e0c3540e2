//! Analysis configuration
//!
//! - `analysis_config`: the `AnalysisConfig` model, presets and builders
//! - `io`: YAML schema v1 loading/saving
//! - `validation`: `Validatable` trait and range checks
//! - `error`: `ConfigError`

pub mod analysis_config;
pub mod error;
pub mod io;
pub mod validation;

pub use analysis_config::{
    AnalysisConfig, ContextPolicyConfig, FunctionLimit, PatternLimit, Preset, SelectiveKcfaConfig,
    SiteLimit, SiteRef, MAX_CONTEXT_DEPTH,
};
pub use error::{ConfigError, ConfigResult};
pub use validation::Validatable;
