//! Entropy predicates
//!
//! All entropies are Shannon entropies in bits over empirical distributions.

use crate::error::RuleError;
use crate::registry::{ParamSchema, ParamSpec, ParamType};
use crate::types::{Outcome, TestRule};
use mcur_common::Sequence;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Timing values are bucketed to this many seconds before counting
pub const TIMING_QUANTUM_S: f64 = 0.01;

/// Entropy in bits of a distribution given by raw counts
pub(crate) fn shannon_entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = usize> + Clone,
{
    let total: usize = counts.clone().into_iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .into_iter()
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>()
        .abs()
}

/// Entropy of values after quantization to [`TIMING_QUANTUM_S`]
fn quantized_entropy(values: impl Iterator<Item = f64>) -> f64 {
    let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
    for v in values {
        *buckets.entry((v / TIMING_QUANTUM_S).round() as i64).or_default() += 1;
    }
    shannon_entropy(buckets.values().copied().collect::<Vec<_>>())
}

// ============================================================================
// note_pitch_entropy
// ============================================================================

/// Lower bound on pitch-class entropy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotePitchEntropy {
    pub min_entropy: f64,
}

impl NotePitchEntropy {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![ParamSpec::required(
            "min_entropy",
            ParamType::non_negative(),
            "Minimum pitch-class entropy in bits (maximum is log2(12))",
        )])
    }
}

impl TestRule for NotePitchEntropy {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        if sequence.is_empty() {
            return Err(RuleError::undefined(
                "pitch-class entropy",
                "sequence has no notes",
            ));
        }
        let mut classes = [0usize; 12];
        for note in sequence.notes() {
            classes[usize::from(note.pitch_class())] += 1;
        }
        let entropy = shannon_entropy(classes);
        Ok(Outcome::check(
            entropy >= self.min_entropy,
            json!({"entropy": entropy, "min_entropy": self.min_entropy}),
        ))
    }
}

// ============================================================================
// note_timing_entropy
// ============================================================================

/// Lower bounds on note-length and onset-delta entropy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteTimingEntropy {
    pub min_length_entropy: f64,
    pub min_onset_delta_entropy: f64,
}

impl NoteTimingEntropy {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::required(
                "min_length_entropy",
                ParamType::non_negative(),
                "Minimum entropy in bits of note durations (10 ms buckets)",
            ),
            ParamSpec::required(
                "min_onset_delta_entropy",
                ParamType::non_negative(),
                "Minimum entropy in bits of inter-onset intervals (10 ms buckets)",
            ),
        ])
    }
}

impl TestRule for NoteTimingEntropy {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let notes = sequence.notes();
        if notes.len() < 2 {
            return Err(RuleError::undefined(
                "timing entropy",
                format!("needs at least 2 notes, got {}", notes.len()),
            ));
        }

        let length_entropy = quantized_entropy(notes.iter().map(|n| n.duration));
        let delta_entropy = quantized_entropy(notes.windows(2).map(|w| w[1].onset - w[0].onset));

        Ok(Outcome::check(
            length_entropy >= self.min_length_entropy
                && delta_entropy >= self.min_onset_delta_entropy,
            json!({
                "length_entropy": length_entropy,
                "onset_delta_entropy": delta_entropy,
                "min_length_entropy": self.min_length_entropy,
                "min_onset_delta_entropy": self.min_onset_delta_entropy,
            }),
        ))
    }
}
