//! Transform stage
//!
//! Applies the plan's pre-processing rules in configuration order. Every
//! transform is total, so the stage cannot fail.

use crate::config::plan::PlanEntry;
use crate::registry::{ParamSchema, ParamSpec, ParamType, RuleDescriptor};
use crate::types::TransformRule;
use mcur_common::{InstrumentClass, Sequence};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::trace;

/// Run every transform in order
pub fn apply(sequence: Sequence, transforms: &[PlanEntry<dyn TransformRule>]) -> Sequence {
    transforms.iter().fold(sequence, |seq, entry| {
        let before = seq.len();
        let out = entry.runner.apply(seq);
        trace!(rule = %entry.id, before, after = out.len(), "Applied transform");
        out
    })
}

/// Drop notes of the selected instrument classes
///
/// Args map class name to bool; classes mapped to `true` are removed, absent
/// or `false` classes are kept. The end time is preserved.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RemoveInstruments {
    pub classes: BTreeMap<InstrumentClass, bool>,
}

impl RemoveInstruments {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(
            InstrumentClass::ALL
                .iter()
                .map(|class| {
                    ParamSpec::optional(class.as_str(), ParamType::Bool, "Remove notes of this class")
                })
                .collect(),
        )
    }

    fn removes(&self, class: InstrumentClass) -> bool {
        self.classes.get(&class).copied().unwrap_or(false)
    }
}

impl TransformRule for RemoveInstruments {
    fn apply(&self, sequence: Sequence) -> Sequence {
        if !self.classes.values().any(|&remove| remove) {
            return sequence;
        }
        sequence.retain(|note| !self.removes(note.instrument_class()))
    }
}

/// Descriptors for every built-in transform
pub fn builtin_rules() -> Vec<RuleDescriptor> {
    vec![RuleDescriptor::transform::<RemoveInstruments>(
        "remove_instruments",
        "Drops notes of the selected instrument classes",
        RemoveInstruments::schema(),
    )]
}
