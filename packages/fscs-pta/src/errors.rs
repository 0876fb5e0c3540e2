//! Crate-wide error types
//!
//! Only structural problems are errors. Modeling gaps found during the
//! fixpoint (unannotated externals, unresolved indirect calls) are recorded as
//! diagnostics on the result instead.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for analysis construction
#[derive(Debug, Error)]
pub enum FscsError {
    /// The program handed over by the front-end is malformed
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    /// A function's control-flow graph is malformed
    #[error("Invalid CFG for function '{function}': {reason}")]
    InvalidCfg { function: String, reason: String },

    /// The configured entry function does not exist or has no body
    #[error("Unknown entry function '{0}'")]
    UnknownEntry(String),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FscsError {
    /// Create an invalid program error
    pub fn invalid_program(msg: impl Into<String>) -> Self {
        Self::InvalidProgram(msg.into())
    }

    /// Create an invalid CFG error
    pub fn invalid_cfg(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCfg {
            function: function.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FscsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FscsError::invalid_cfg("main", "missing entry node");
        assert_eq!(
            err.to_string(),
            "Invalid CFG for function 'main': missing entry node"
        );

        let err = FscsError::UnknownEntry("start".to_string());
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: FscsError = ConfigError::MissingVersion.into();
        assert!(matches!(err, FscsError::Config(_)));
    }
}
