//! Core Types and Trait Definitions for mcur-curate
//!
//! Defines the three rule traits the execution plan dispatches to:
//! - [`TestRule`]: read-only predicate producing an [`Outcome`]
//! - [`TransformRule`]: total rewrite of a sequence
//! - [`MetadataRule`]: tag extractor owning one metadata category
//!
//! and the records that flow out of the pipeline ([`Verdict`],
//! [`CurationResult`]).

use crate::error::RuleError;
use mcur_common::Sequence;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Rule traits
// ============================================================================

/// Quality-gate predicate
///
/// Implementations are immutable parameter structs; `evaluate` is a pure
/// function of the sequence. Shared across worker threads behind `Arc`.
pub trait TestRule: Send + Sync + fmt::Debug {
    /// Evaluate the predicate
    ///
    /// # Errors
    /// Returns `RuleError` when the statistic is undefined for this input
    /// (e.g. mean velocity of an empty sequence). The gate converts the error
    /// into a failing verdict.
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError>;
}

/// Pre-processing rewrite
///
/// Must be total: any well-formed sequence produces a well-formed sequence.
pub trait TransformRule: Send + Sync + fmt::Debug {
    fn apply(&self, sequence: Sequence) -> Sequence;
}

/// Metadata extractor
///
/// Each extractor writes exactly one category. No match means no tag.
pub trait MetadataRule: Send + Sync + fmt::Debug {
    /// Category this extractor writes (e.g. "composer")
    fn category(&self) -> &str;

    /// Every value this extractor can emit, if that set is closed
    ///
    /// Used to check extractors against the manual vocabulary. Open-ended
    /// extractors (such as `abs_path`) return `None`.
    fn vocabulary(&self) -> Option<BTreeSet<String>>;

    /// Extract tag values for this category
    fn extract(&self, sequence: &Sequence, context: &SourceContext) -> BTreeSet<String>;
}

// ============================================================================
// Rule outputs
// ============================================================================

/// Raw result of a test rule before it is attributed to a plan entry
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub passed: bool,
    pub detail: Value,
}

impl Outcome {
    pub fn pass(detail: Value) -> Self {
        Self {
            passed: true,
            detail,
        }
    }

    pub fn fail(detail: Value) -> Self {
        Self {
            passed: false,
            detail,
        }
    }

    pub fn check(passed: bool, detail: Value) -> Self {
        Self { passed, detail }
    }
}

/// Pass/fail outcome of one plan entry on one sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Plan entry id (`rule` or `rule#n` for threshold profiles)
    pub rule: String,
    pub passed: bool,
    /// Structured diagnostic (measured values, offending window, error)
    pub detail: Value,
}

/// Tags grouped by metadata category
pub type Tags = BTreeMap<String, BTreeSet<String>>;

/// External information about where a sequence came from
///
/// Supplied by the parsing collaborator alongside the notes; metadata
/// extractors match against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceContext {
    /// Source file path, if the sequence came from a file
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Embedded text meta messages (track names, copyright, lyrics, ...)
    #[serde(default)]
    pub text_messages: Vec<String>,
    /// Dataset-specific record fields (e.g. from a dataset index file)
    #[serde(default)]
    pub dataset_fields: BTreeMap<String, String>,
}

impl SourceContext {
    /// Context for a file path only
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// File name component of the path
    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Terminal artifact of one pipeline run over one input sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurationResult {
    /// Sequence after the transform stage
    pub sequence: Sequence,
    /// True iff every verdict passed
    pub admitted: bool,
    /// Verdicts in plan order
    pub verdicts: Vec<Verdict>,
    pub tags: Tags,
}

impl CurationResult {
    /// Verdicts that did not pass
    pub fn failed_verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| !v.passed)
    }
}
