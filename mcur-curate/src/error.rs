//! Error types for mcur-curate
//!
//! Three layers, three lifetimes:
//! - [`ConfigError`] is fatal and raised before any sequence is touched
//! - [`RuleError`] is recovered inside the quality gate as a failing verdict
//! - [`mcur_common::DataIntegrityError`] excludes a single sequence from a batch

use crate::registry::RuleKind;
use thiserror::Error;

/// Result type for configuration loading and resolution
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rule registry lookup and registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A rule with this name is already registered for the kind
    #[error("Duplicate rule: '{name}' is already registered as a {kind} rule")]
    DuplicateRule { name: String, kind: RuleKind },

    /// No rule with this name is registered for the kind
    #[error("Unknown rule: no {kind} rule named '{name}'")]
    UnknownRule { name: String, kind: RuleKind },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Registry lookup failed (unknown rule)
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Argument failed schema validation
    #[error("Schema violation in rule '{rule}': parameter '{field}' {reason}")]
    SchemaViolation {
        rule: String,
        field: String,
        reason: String,
    },

    /// A rule entry does not have the `{run, args}` shape
    #[error("Malformed entry for rule '{rule}': {reason}")]
    MalformedEntry { rule: String, reason: String },

    /// Document-level structure problem (unknown section, wrong shape)
    #[error("Malformed configuration: {0}")]
    Malformed(String),

    /// Two enabled extractors write the same metadata category
    #[error("Metadata category '{category}' is claimed by both '{first}' and '{second}'")]
    CategoryConflict {
        category: String,
        first: String,
        second: String,
    },

    /// An extractor can emit a value the manual vocabulary does not allow
    #[error("Rule '{rule}' can emit '{value}', which is not in the manual '{category}' vocabulary")]
    VocabularyMismatch {
        rule: String,
        category: String,
        value: String,
    },

    /// Tokenizer guidance window bounds are inverted
    #[error("Invalid tokenizer guidance window: min_ms {min_ms} > max_ms {max_ms}")]
    BadGuidanceWindow { min_ms: u64, max_ms: u64 },

    /// Configuration text could not be parsed
    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure inside a rule body
///
/// Never propagated past the quality gate: the gate turns it into a failing
/// verdict whose detail carries the message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// The statistic the rule needs does not exist for this input
    #[error("{statistic} is undefined: {reason}")]
    Undefined {
        statistic: &'static str,
        reason: String,
    },
}

impl RuleError {
    pub fn undefined(statistic: &'static str, reason: impl Into<String>) -> Self {
        RuleError::Undefined {
            statistic,
            reason: reason.into(),
        }
    }
}

/// Operator-supplied tag rejected by the manual vocabulary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("Unknown manual tag category '{0}'")]
    UnknownCategory(String),

    #[error("Value '{value}' is not in the manual '{category}' vocabulary")]
    UnknownValue { category: String, value: String },
}
