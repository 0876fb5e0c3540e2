//! Configuration error types

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Range validation error
    #[error("Invalid range for field '{field}': {value} not in {min}..={max}. {hint}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
        hint: String,
    },

    /// Missing version field in YAML
    #[error("Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    /// Unsupported version
    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// A site override names a function the program does not have
    #[error("Unknown function '{function}'. {suggestion}")]
    UnknownFunction { function: String, suggestion: String },

    /// A site override names a node that is not a call/allocation site
    #[error("Node {node} of function '{function}' is not a {expected} site")]
    UnknownSite {
        function: String,
        node: u32,
        expected: &'static str,
    },

    /// Callee-name pattern does not compile
    #[error("Invalid callee pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Malformed effect position/descriptor in an external effect table
    #[error("Invalid effect descriptor '{0}'")]
    InvalidDescriptor(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create a range error with a hint
    pub fn range_with_hint(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
        hint: impl Into<String>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            hint: hint.into(),
        }
    }

    /// Create an unknown function error, suggesting the closest known name
    pub fn unknown_function<'a>(
        function: impl Into<String>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let function = function.into();
        let suggestion = find_closest_match(&function, known);
        Self::UnknownFunction {
            function,
            suggestion,
        }
    }
}

/// Find closest match using simple edit distance
fn find_closest_match<'a>(target: &str, candidates: impl IntoIterator<Item = &'a str>) -> String {
    match candidates
        .into_iter()
        .min_by_key(|candidate| levenshtein_distance(target, candidate))
    {
        Some(closest) => format!("Did you mean '{}'?", closest),
        None => "The program defines no functions".to_string(),
    }
}

/// Simple Levenshtein distance over chars
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let b: Vec<char> = s2.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, c1) in s1.chars().enumerate() {
        let mut row = Vec::with_capacity(b.len() + 1);
        row.push(i + 1);
        for (j, &c2) in b.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            row.push((prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1));
        }
        prev = row;
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("malloc", "malloc"), 0);
        assert_eq!(levenshtein_distance("malloc", "maloc"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn test_unknown_function_suggestion() {
        let err = ConfigError::unknown_function("mian", ["main", "helper"]);
        assert!(err.to_string().contains("Did you mean 'main'?"));

        let err = ConfigError::unknown_function("main", std::iter::empty());
        assert!(err.to_string().contains("defines no functions"));
    }

    #[test]
    fn test_range_error_display() {
        let err = ConfigError::range_with_hint("k", 99, 0, 16, "Use selective k-CFA instead");
        assert_eq!(
            err.to_string(),
            "Invalid range for field 'k': 99 not in 0..=16. Use selective k-CFA instead"
        );
    }
}
