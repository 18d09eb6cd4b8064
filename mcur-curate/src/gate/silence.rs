//! Silent-interval predicate

use crate::error::RuleError;
use crate::registry::{ParamSchema, ParamSpec, ParamType};
use crate::types::{Outcome, TestRule};
use mcur_common::Sequence;
use serde::Deserialize;
use serde_json::json;

/// Upper bound on any stretch without a note onset
///
/// Gaps are measured between consecutive onsets, plus the lead-in from zero
/// to the first onset and the tail from the last onset to the end time.
/// An empty sequence is one gap spanning its whole duration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SilentInterval {
    pub max_silence_s: f64,
}

impl SilentInterval {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![ParamSpec::required(
            "max_silence_s",
            ParamType::positive(),
            "Longest allowed gap between note onsets, in seconds",
        )])
    }
}

impl TestRule for SilentInterval {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let (gap_start, gap) = longest_gap(sequence);
        let detail = json!({
            "longest_gap_s": gap,
            "gap_start_s": gap_start,
            "max_silence_s": self.max_silence_s,
        });
        Ok(Outcome::check(gap <= self.max_silence_s, detail))
    }
}

/// Start and length of the longest onset gap
fn longest_gap(sequence: &Sequence) -> (f64, f64) {
    let mut best = (0.0, 0.0);
    let mut previous = 0.0;
    let onsets = sequence
        .notes()
        .iter()
        .map(|n| n.onset)
        .chain(std::iter::once(sequence.duration()));
    for onset in onsets {
        let gap = onset - previous;
        if gap > best.1 {
            best = (previous, gap);
        }
        previous = onset;
    }
    best
}
