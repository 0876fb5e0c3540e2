//! Non-fatal modeling gaps found during analysis

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::shared::models::NodeRef;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// External function missing from the effect table; treated as a no-op
    UnannotatedExternal { function: String },
    /// Indirect call whose target set contains no function
    UnresolvedIndirectCall { site: NodeRef },
    /// Pointer argument count differs from the callee's pointer parameters
    ArgumentCountMismatch {
        site: NodeRef,
        callee: String,
        params: usize,
        args: usize,
    },
    /// An alloc effect names a size operand the call does not have
    MissingSizeArgument { site: NodeRef, callee: String, position: u32 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnannotatedExternal { function } => {
                write!(f, "no effect annotation for external function '{}'; treated as no-op", function)
            }
            Diagnostic::UnresolvedIndirectCall { site } => {
                write!(f, "indirect call at {} has no resolvable target", site)
            }
            Diagnostic::ArgumentCountMismatch {
                site,
                callee,
                params,
                args,
            } => write!(
                f,
                "call at {} passes {} pointer arguments to '{}' which takes {}",
                site, args, callee, params
            ),
            Diagnostic::MissingSizeArgument {
                site,
                callee,
                position,
            } => write!(f, "call to '{}' at {} has no argument {} for the allocation size", callee, site, position),
        }
    }
}

/// Deduplicated diagnostics in discovery order
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    seen: FxHashSet<Diagnostic>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic the first time it is seen
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if self.seen.insert(diagnostic.clone()) {
            warn!("{}", diagnostic);
            self.entries.push(diagnostic);
        }
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_deduplicates() {
        let mut diagnostics = Diagnostics::new();
        let missing = Diagnostic::UnannotatedExternal {
            function: "frobnicate".into(),
        };
        diagnostics.report(missing.clone());
        diagnostics.report(missing.clone());
        assert_eq!(diagnostics.entries(), &[missing]);
        assert!(diagnostics.entries()[0].to_string().contains("frobnicate"));
    }
}
