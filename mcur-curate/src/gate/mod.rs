//! Quality gate
//!
//! Runs the plan's test entries against a sequence and combines their
//! verdicts. Admission is the conjunction of every entry, threshold profiles
//! included. A rule error becomes a failing verdict carrying the message and
//! never escapes the gate.

pub mod density;
pub mod entropy;
pub mod repetition;
pub mod scalar;
pub mod silence;

use crate::config::plan::PlanEntry;
use crate::registry::RuleDescriptor;
use crate::types::{TestRule, Verdict};
use mcur_common::Sequence;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

pub use density::{NoteDensityInInterval, UniquePitchCountInInterval};
pub use entropy::{NotePitchEntropy, NoteTimingEntropy};
pub use repetition::RepetitiveContent;
pub use scalar::{
    MaxInstruments, MaxPrograms, MeanNoteVelocity, MinLength, NoteFrequencyPerInstrument,
    TotalNoteFrequency, UniquePitchCount,
};
pub use silence::SilentInterval;

/// How many tests run once one has failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Run every test and keep every verdict (diagnostic runs)
    #[default]
    Exhaustive,
    /// Stop at the first failing verdict
    FailFast,
}

/// Admission decision with its supporting verdicts
#[derive(Debug, Clone, PartialEq)]
pub struct GateReport {
    pub admitted: bool,
    /// Verdicts in plan order; truncated after the first failure in fail-fast mode
    pub verdicts: Vec<Verdict>,
}

/// Evaluate every test entry against the sequence
pub fn evaluate(
    sequence: &Sequence,
    tests: &[PlanEntry<dyn TestRule>],
    mode: GateMode,
) -> GateReport {
    let mut verdicts = Vec::with_capacity(tests.len());
    let mut admitted = true;

    for entry in tests {
        let verdict = run_test(entry, sequence);
        if !verdict.passed {
            debug!(rule = %verdict.rule, detail = %verdict.detail, "Test failed");
            admitted = false;
        }
        verdicts.push(verdict);
        if !admitted && mode == GateMode::FailFast {
            break;
        }
    }

    GateReport { admitted, verdicts }
}

fn run_test(entry: &PlanEntry<dyn TestRule>, sequence: &Sequence) -> Verdict {
    match entry.runner.evaluate(sequence) {
        Ok(outcome) => Verdict {
            rule: entry.id.clone(),
            passed: outcome.passed,
            detail: outcome.detail,
        },
        Err(e) => Verdict {
            rule: entry.id.clone(),
            passed: false,
            detail: json!({ "error": e.to_string() }),
        },
    }
}

/// Descriptors for every built-in test rule
pub fn builtin_rules() -> Vec<RuleDescriptor> {
    vec![
        RuleDescriptor::test::<NoteDensityInInterval>(
            "note_density_in_interval",
            "Caps total and per-pitch note density in onset-anchored windows",
            NoteDensityInInterval::schema(),
        ),
        RuleDescriptor::test::<SilentInterval>(
            "silent_interval",
            "Caps the longest gap between note onsets",
            SilentInterval::schema(),
        ),
        RuleDescriptor::test::<NotePitchEntropy>(
            "note_pitch_entropy",
            "Requires a minimum pitch-class entropy",
            NotePitchEntropy::schema(),
        ),
        RuleDescriptor::test::<NoteTimingEntropy>(
            "note_timing_entropy",
            "Requires minimum entropy of note lengths and onset deltas",
            NoteTimingEntropy::schema(),
        ),
        RuleDescriptor::test::<UniquePitchCount>(
            "unique_pitch_count",
            "Requires a minimum number of distinct pitches",
            UniquePitchCount::schema(),
        ),
        RuleDescriptor::test::<UniquePitchCountInInterval>(
            "unique_pitch_count_in_interval",
            "Requires a minimum number of distinct pitches in every window",
            UniquePitchCountInInterval::schema(),
        ),
        RuleDescriptor::test::<MeanNoteVelocity>(
            "mean_note_velocity",
            "Bounds the mean note velocity",
            MeanNoteVelocity::schema(),
        ),
        RuleDescriptor::test::<TotalNoteFrequency>(
            "total_note_frequency",
            "Bounds notes per second over the whole sequence",
            TotalNoteFrequency::schema(),
        ),
        RuleDescriptor::test::<NoteFrequencyPerInstrument>(
            "note_frequency_per_instrument",
            "Bounds notes per second for every instrument class present",
            NoteFrequencyPerInstrument::schema(),
        ),
        RuleDescriptor::test::<MinLength>(
            "min_length",
            "Requires a minimum duration",
            MinLength::schema(),
        ),
        RuleDescriptor::test::<MaxPrograms>(
            "max_programs",
            "Caps the number of distinct programs",
            MaxPrograms::schema(),
        ),
        RuleDescriptor::test::<MaxInstruments>(
            "max_instruments",
            "Caps the number of distinct instrument classes",
            MaxInstruments::schema(),
        ),
        RuleDescriptor::test::<RepetitiveContent>(
            "repetitive_content",
            "Rejects long sequences whose sections share one pitch-class profile",
            RepetitiveContent::schema(),
        ),
    ]
}
