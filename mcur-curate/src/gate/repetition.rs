//! Repetitive-content predicate
//!
//! Long recordings that loop the same material produce near-identical
//! pitch-class histograms across their sections. The rule splits the
//! sequence into equal-duration chunks and rejects it when any two non-empty
//! chunks are closer than the tolerance in KL divergence.

use crate::error::RuleError;
use crate::registry::{ParamSchema, ParamSpec, ParamType};
use crate::types::{Outcome, TestRule};
use mcur_common::{Note, Sequence};
use serde::Deserialize;
use serde_json::json;

/// Pseudo-count added to every pitch class before normalizing
pub const HISTOGRAM_SMOOTHING: f64 = 1.0;

/// Largest accepted `num_chunks`; comparisons grow with its square
pub const MAX_CHUNKS: i64 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepetitiveContent {
    pub min_length_m: f64,
    pub num_chunks: usize,
    pub kl_tolerance: f64,
}

impl RepetitiveContent {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::required(
                "min_length_m",
                ParamType::positive(),
                "Only sequences longer than this many minutes are checked",
            ),
            ParamSpec::required(
                "num_chunks",
                ParamType::Integer {
                    min: 2,
                    max: MAX_CHUNKS,
                },
                "Number of equal-duration chunks to compare",
            ),
            ParamSpec::required(
                "kl_tolerance",
                ParamType::non_negative(),
                "Fail when any chunk pair diverges by less than this (nats)",
            ),
        ])
    }
}

/// Smoothed pitch-class distribution of one chunk
fn histogram(notes: &[Note]) -> [f64; 12] {
    let mut counts = [HISTOGRAM_SMOOTHING; 12];
    for note in notes {
        counts[usize::from(note.pitch_class())] += 1.0;
    }
    let total: f64 = counts.iter().sum();
    counts.map(|c| c / total)
}

/// KL(p‖q) in nats; both distributions are strictly positive
fn kl_divergence(p: &[f64; 12], q: &[f64; 12]) -> f64 {
    p.iter().zip(q).map(|(pi, qi)| pi * (pi / qi).ln()).sum()
}

impl TestRule for RepetitiveContent {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let threshold_s = self.min_length_m * 60.0;
        if sequence.duration() <= threshold_s {
            return Ok(Outcome::pass(json!({
                "skipped": true,
                "duration_s": sequence.duration(),
                "min_length_s": threshold_s,
            })));
        }

        let chunks: Vec<(usize, [f64; 12])> = sequence
            .chunks_by_duration(self.num_chunks)
            .enumerate()
            .filter(|(_, notes)| !notes.is_empty())
            .map(|(i, notes)| (i, histogram(notes)))
            .collect();

        let mut min_kl = f64::INFINITY;
        for (i, p) in &chunks {
            for (j, q) in &chunks {
                if i == j {
                    continue;
                }
                let kl = kl_divergence(p, q);
                min_kl = min_kl.min(kl);
                if kl < self.kl_tolerance {
                    return Ok(Outcome::fail(json!({
                        "chunks": [i, j],
                        "kl": kl,
                        "kl_tolerance": self.kl_tolerance,
                    })));
                }
            }
        }

        Ok(Outcome::pass(json!({
            "skipped": false,
            "compared_chunks": chunks.len(),
            "min_kl": if min_kl.is_finite() { Some(min_kl) } else { None },
        })))
    }
}
