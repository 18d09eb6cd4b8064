//! Configuration resolution
//!
//! Turns a [`CurationConfig`] into an [`ExecutionPlan`]. Resolution is
//! all-or-nothing: the first unknown rule, schema violation, category
//! conflict or vocabulary mismatch aborts it before any sequence is touched.
//!
//! Per enabled entry:
//! 1. Parse the `{run, args}` shape
//! 2. Look the rule up in the registry
//! 3. Expand `test_params_list` into `rule#1..rule#n` (tests only)
//! 4. Validate each argument set against the rule's schema
//! 5. Bind into a typed rule and append in declaration order

use super::plan::{ExecutionPlan, PlanEntry};
use super::{CurationConfig, RuleEntry};
use crate::error::{ConfigError, ConfigResult};
use crate::metadata::ManualVocabulary;
use crate::registry::{BoundRule, RuleKind, RuleRegistry, BUILTIN_REGISTRY};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Args key holding multiple threshold profiles for one test rule
pub const PROFILE_LIST_KEY: &str = "test_params_list";

/// Resolve against the built-in registry
pub fn resolve_builtin(config: &CurationConfig) -> ConfigResult<ExecutionPlan> {
    resolve(config, &BUILTIN_REGISTRY)
}

/// Resolve a configuration into an execution plan
pub fn resolve(config: &CurationConfig, registry: &RuleRegistry) -> ConfigResult<ExecutionPlan> {
    let mut plan = ExecutionPlan::default();

    for (id, rule, args, bound) in bind_section(&config.tests, RuleKind::Test, registry)? {
        if let BoundRule::Test(runner) = bound {
            plan.tests.push(PlanEntry::new(id, rule, args, runner));
        }
    }

    for (id, rule, args, bound) in
        bind_section(&config.pre_processing, RuleKind::PreProcessing, registry)?
    {
        if let BoundRule::Transform(runner) = bound {
            plan.pre_processing
                .push(PlanEntry::new(id, rule, args, runner));
        }
    }

    let mut claimed: BTreeMap<String, String> = BTreeMap::new();
    for (id, rule, args, bound) in
        bind_section(&config.metadata.functions, RuleKind::Metadata, registry)?
    {
        if let BoundRule::Metadata(runner) = bound {
            let category = runner.category().to_string();
            if let Some(first) = claimed.get(&category) {
                return Err(ConfigError::CategoryConflict {
                    category,
                    first: first.clone(),
                    second: id,
                });
            }
            claimed.insert(category, id.clone());
            plan.metadata.push(PlanEntry::new(id, rule, args, runner));
        }
    }

    plan.vocabulary = ManualVocabulary::new(&config.metadata.manual);
    for entry in &plan.metadata {
        plan.vocabulary.check_extractor(&entry.id, entry.runner.as_ref())?;
    }

    plan.guidance = config.tokenizer.as_ref().and_then(|t| t.guidance);
    if let Some(window) = plan.guidance {
        if window.min_ms > window.max_ms {
            return Err(ConfigError::BadGuidanceWindow {
                min_ms: window.min_ms,
                max_ms: window.max_ms,
            });
        }
    }

    info!(
        tests = plan.tests.len(),
        pre_processing = plan.pre_processing.len(),
        metadata = plan.metadata.len(),
        manual_categories = plan.vocabulary.len(),
        "Resolved execution plan"
    );
    Ok(plan)
}

/// `(entry id, rule name, args, bound rule)`
type Bound = (String, String, Value, BoundRule);

/// Resolve, validate and bind every enabled entry of one section
fn bind_section(
    section: &Map<String, Value>,
    kind: RuleKind,
    registry: &RuleRegistry,
) -> ConfigResult<Vec<Bound>> {
    let mut bound = Vec::new();

    for (name, raw) in section {
        let entry: RuleEntry =
            serde_json::from_value(raw.clone()).map_err(|e| ConfigError::MalformedEntry {
                rule: name.clone(),
                reason: e.to_string(),
            })?;
        if !entry.run {
            debug!(rule = %name, kind = %kind, "Rule disabled, skipping");
            continue;
        }

        let descriptor = registry.resolve(name, kind)?;
        let profiles = if kind == RuleKind::Test {
            expand_profiles(name, entry.args)?
        } else {
            vec![(name.clone(), entry.args)]
        };

        for (id, args) in profiles {
            descriptor.schema.validate(&id, &args)?;
            let rule = descriptor
                .bind(&args)
                .map_err(|e| ConfigError::MalformedEntry {
                    rule: id.clone(),
                    reason: e.to_string(),
                })?;
            if rule.kind() != kind {
                return Err(ConfigError::Malformed(format!(
                    "rule '{}' is registered as {} but binds to a {} rule",
                    name,
                    kind,
                    rule.kind()
                )));
            }
            debug!(rule = %id, kind = %kind, args = %args, "Bound rule");
            bound.push((id, name.clone(), args, rule));
        }
    }

    Ok(bound)
}

/// Split a test entry's args into one `(id, args)` pair per threshold profile
fn expand_profiles(name: &str, args: Value) -> ConfigResult<Vec<(String, Value)>> {
    if args.get(PROFILE_LIST_KEY).is_none() {
        return Ok(vec![(name.to_string(), args)]);
    }

    let malformed = |reason: String| ConfigError::MalformedEntry {
        rule: name.to_string(),
        reason,
    };

    if args.as_object().map_or(0, Map::len) > 1 {
        return Err(malformed(format!(
            "'{}' must be the only key in args",
            PROFILE_LIST_KEY
        )));
    }
    let profiles = match args.get(PROFILE_LIST_KEY) {
        Some(Value::Array(profiles)) if !profiles.is_empty() => profiles,
        _ => {
            return Err(malformed(format!(
                "'{}' must be a non-empty list of mappings",
                PROFILE_LIST_KEY
            )))
        }
    };

    profiles
        .iter()
        .enumerate()
        .map(|(i, profile)| {
            if !profile.is_object() {
                return Err(malformed(format!(
                    "profile {} in '{}' is not a mapping",
                    i + 1,
                    PROFILE_LIST_KEY
                )));
            }
            Ok((format!("{}#{}", name, i + 1), profile.clone()))
        })
        .collect()
}
