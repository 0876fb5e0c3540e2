//! Configuration I/O (YAML schema v1)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::analysis_config::{AnalysisConfig, ContextPolicyConfig, Preset};
use super::error::{ConfigError, ConfigResult};
use super::validation::Validatable;

/// Schema versions this crate can read
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
///
/// Every field except `version` is optional; omitted fields come from
/// `preset` (default `balanced`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    #[serde(default)]
    pub version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_policy: Option<ContextPolicyConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_global_contexts: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_table: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_function: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,
}

impl From<&AnalysisConfig> for ConfigExportV1 {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            version: Some(1),
            preset: None,
            context_policy: Some(config.context_policy.clone()),
            preserve_global_contexts: Some(config.preserve_global_contexts),
            external_table: config.external_table.clone(),
            entry_function: Some(config.entry_function.clone()),
            max_iterations: Some(config.max_iterations),
            time_budget_ms: Some(config.time_budget_ms),
        }
    }
}

impl ConfigExportV1 {
    /// Check the version and apply overrides on top of the preset
    pub fn into_config(self) -> ConfigResult<AnalysisConfig> {
        let version = self.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let mut config = AnalysisConfig::preset(self.preset.unwrap_or(Preset::Balanced));
        if let Some(policy) = self.context_policy {
            config.context_policy = policy;
        }
        if let Some(preserve) = self.preserve_global_contexts {
            config.preserve_global_contexts = preserve;
        }
        if let Some(path) = self.external_table {
            config.external_table = Some(path);
        }
        if let Some(entry) = self.entry_function {
            config.entry_function = entry;
        }
        if let Some(n) = self.max_iterations {
            config.max_iterations = n;
        }
        if let Some(ms) = self.time_budget_ms {
            config.time_budget_ms = ms;
        }
        Ok(config)
    }
}

impl AnalysisConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(yaml)?;
        let config = export.into_config()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file. A relative `external_table` is resolved against the
    /// directory of the configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;

        if let (Some(table), Some(dir)) = (config.external_table.as_mut(), path.parent()) {
            if table.is_relative() {
                *table = dir.join(&*table);
            }
        }
        debug!(path = %path.display(), policy = ?config.context_policy, "loaded analysis config");
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(&ConfigExportV1::from(self))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::analysis_config::SiteLimit;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_yaml_roundtrip() {
        let config = AnalysisConfig::preset(Preset::Precise)
            .with_policy(
                ContextPolicyConfig::selective(1)
                    .call_site("main", 3, 2)
                    .pattern("^wrap_", 0)
                    .into(),
            )
            .preserve_global_contexts(true);

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("kind: selective_kcfa"));

        let loaded = AnalysisConfig::from_yaml(&yaml).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
version: 1
preset: insensitive
context_policy:
  kind: selective_kcfa
  default_k: 1
  call_sites:
    - { function: main, node: 4, k: 2 }
max_iterations: 5000
"#;
        let config = AnalysisConfig::from_yaml(yaml).unwrap();
        match &config.context_policy {
            ContextPolicyConfig::SelectiveKcfa(selective) => {
                assert_eq!(selective.default_k, 1);
                assert_eq!(
                    selective.call_sites,
                    vec![SiteLimit {
                        function: "main".to_string(),
                        node: 4,
                        k: 2
                    }]
                );
            }
            other => panic!("unexpected policy {:?}", other),
        }
        assert_eq!(config.max_iterations, 5000);
        assert_eq!(config.entry_function, "main");
    }

    #[test]
    fn test_preset_only() {
        let config = AnalysisConfig::from_yaml("version: 1\npreset: precise\n").unwrap();
        assert_eq!(config.context_policy, ContextPolicyConfig::uniform(2));
    }

    #[test]
    fn test_missing_version() {
        let err = AnalysisConfig::from_yaml("preset: balanced\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVersion));
    }

    #[test]
    fn test_unsupported_version() {
        let err = AnalysisConfig::from_yaml("version: 7\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 7, .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = AnalysisConfig::from_yaml("version: 1\nflow_sensitive: false\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_validation_applied_on_load() {
        let yaml = "version: 1\ncontext_policy:\n  kind: uniform_k\n  k: 99\n";
        let err = AnalysisConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Range { .. }));
    }

    #[test]
    fn test_file_loading_resolves_table_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "version: 1\nexternal_table: effects.yaml").unwrap();

        let config = AnalysisConfig::from_yaml_file(file.path()).unwrap();
        let expected = file.path().parent().unwrap().join("effects.yaml");
        assert_eq!(config.external_table, Some(expected));
    }

    #[test]
    fn test_missing_file() {
        let err = AnalysisConfig::from_yaml_file("/nonexistent/fscs.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
