//! Execution plan
//!
//! The immutable product of configuration resolution. Shared read-only by
//! every pipeline invocation (wrap it in `Arc`).

use crate::metadata::ManualVocabulary;
use crate::registry::RuleKind;
use crate::types::{MetadataRule, TestRule, TransformRule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One bound rule in plan order
pub struct PlanEntry<R: ?Sized> {
    /// Verdict id: the rule name, or `rule#n` for the n-th threshold profile
    pub id: String,
    /// Registered rule name
    pub rule: String,
    /// Validated arguments the rule was bound with
    pub args: Value,
    pub runner: Arc<R>,
}

impl<R: ?Sized> PlanEntry<R> {
    pub fn new(id: impl Into<String>, rule: impl Into<String>, args: Value, runner: Arc<R>) -> Self {
        Self {
            id: id.into(),
            rule: rule.into(),
            args,
            runner,
        }
    }
}

impl<R: ?Sized> Clone for PlanEntry<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            rule: self.rule.clone(),
            args: self.args.clone(),
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<R: ?Sized + fmt::Debug> fmt::Debug for PlanEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanEntry")
            .field("id", &self.id)
            .field("args", &self.args)
            .field("runner", &self.runner)
            .finish()
    }
}

/// Tokenizer guidance window, validated and passed through to the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuidanceWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Comparable, serializable view of one plan entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub kind: RuleKind,
    pub id: String,
    pub rule: String,
    pub args: Value,
}

/// Resolved configuration: rules bound in declaration order
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub tests: Vec<PlanEntry<dyn TestRule>>,
    pub pre_processing: Vec<PlanEntry<dyn TransformRule>>,
    pub metadata: Vec<PlanEntry<dyn MetadataRule>>,
    /// Closed vocabulary for operator-supplied tags
    pub vocabulary: ManualVocabulary,
    pub guidance: Option<GuidanceWindow>,
}

impl ExecutionPlan {
    /// Every entry as a plain step, stage by stage in plan order
    pub fn steps(&self) -> Vec<PlanStep> {
        fn step<R: ?Sized>(kind: RuleKind, entry: &PlanEntry<R>) -> PlanStep {
            PlanStep {
                kind,
                id: entry.id.clone(),
                rule: entry.rule.clone(),
                args: entry.args.clone(),
            }
        }

        let tests = self.tests.iter().map(|e| step(RuleKind::Test, e));
        let transforms = self
            .pre_processing
            .iter()
            .map(|e| step(RuleKind::PreProcessing, e));
        let metadata = self.metadata.iter().map(|e| step(RuleKind::Metadata, e));
        tests.chain(transforms).chain(metadata).collect()
    }

    /// Total number of bound entries
    pub fn len(&self) -> usize {
        self.tests.len() + self.pre_processing.len() + self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata categories written by the plan's extractors
    pub fn metadata_categories(&self) -> Vec<&str> {
        self.metadata.iter().map(|e| e.runner.category()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::types::Outcome;
    use mcur_common::Sequence;
    use serde_json::json;

    #[derive(Debug)]
    struct Noop;

    impl TestRule for Noop {
        fn evaluate(&self, _sequence: &Sequence) -> Result<Outcome, RuleError> {
            Ok(Outcome::pass(Value::Null))
        }
    }

    #[test]
    fn test_steps_and_len() {
        let runner: Arc<dyn TestRule> = Arc::new(Noop);
        let plan = ExecutionPlan {
            tests: vec![
                PlanEntry::new("noop#1", "noop", json!({"a": 1}), runner.clone()),
                PlanEntry::new("noop#2", "noop", json!({"a": 2}), runner),
            ],
            ..ExecutionPlan::default()
        };
        assert_eq!(plan.len(), 2);
        assert!(!plan.is_empty());

        let steps = plan.steps();
        assert_eq!(steps[1].id, "noop#2");
        assert_eq!(steps[1].rule, "noop");
        assert_eq!(steps[1].kind, RuleKind::Test);
        assert_eq!(steps[1].args, json!({"a": 2}));
        assert_eq!(plan.clone().steps(), steps);
    }

    #[test]
    fn test_empty_plan() {
        let plan = ExecutionPlan::default();
        assert!(plan.is_empty());
        assert!(plan.steps().is_empty());
        assert!(plan.metadata_categories().is_empty());
    }
}
