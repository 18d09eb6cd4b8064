//! Whole-sequence threshold predicates
//!
//! Each rule reduces the sequence to one statistic (or one per instrument
//! class) and compares it against configured bounds. Ranges are inclusive.

use crate::error::RuleError;
use crate::registry::{ParamSchema, ParamSpec, ParamType};
use crate::types::{Outcome, TestRule};
use mcur_common::{InstrumentClass, Sequence};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

fn rate_schema() -> ParamSchema {
    ParamSchema::new(vec![
        ParamSpec::required(
            "min_per_second",
            ParamType::non_negative(),
            "Minimum notes per second",
        ),
        ParamSpec::required(
            "max_per_second",
            ParamType::positive(),
            "Maximum notes per second",
        ),
    ])
    .with_ordered("min_per_second", "max_per_second")
}

fn require_duration(sequence: &Sequence, statistic: &'static str) -> Result<f64, RuleError> {
    let duration = sequence.duration();
    if duration <= 0.0 {
        return Err(RuleError::undefined(statistic, "sequence has zero duration"));
    }
    Ok(duration)
}

// ============================================================================
// unique_pitch_count
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniquePitchCount {
    pub min_num_unique_pitches: usize,
}

impl UniquePitchCount {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![ParamSpec::required(
            "min_num_unique_pitches",
            ParamType::at_least(1),
            "Distinct pitches required across the sequence",
        )])
    }
}

impl TestRule for UniquePitchCount {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let unique = sequence.distinct_pitches().len();
        Ok(Outcome::check(
            unique >= self.min_num_unique_pitches,
            json!({"unique_pitches": unique, "min_num_unique_pitches": self.min_num_unique_pitches}),
        ))
    }
}

// ============================================================================
// mean_note_velocity
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeanNoteVelocity {
    pub min_mean_velocity: f64,
    pub max_mean_velocity: f64,
}

impl MeanNoteVelocity {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::required(
                "min_mean_velocity",
                ParamType::range(0.0, 127.0),
                "Lowest allowed mean velocity",
            ),
            ParamSpec::required(
                "max_mean_velocity",
                ParamType::range(0.0, 127.0),
                "Highest allowed mean velocity",
            ),
        ])
        .with_ordered("min_mean_velocity", "max_mean_velocity")
    }
}

impl TestRule for MeanNoteVelocity {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        if sequence.is_empty() {
            return Err(RuleError::undefined("mean velocity", "sequence has no notes"));
        }
        let sum: f64 = sequence.notes().iter().map(|n| f64::from(n.velocity)).sum();
        let mean = sum / sequence.len() as f64;
        Ok(Outcome::check(
            (self.min_mean_velocity..=self.max_mean_velocity).contains(&mean),
            json!({"mean_velocity": mean}),
        ))
    }
}

// ============================================================================
// total_note_frequency
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TotalNoteFrequency {
    pub min_per_second: f64,
    pub max_per_second: f64,
}

impl TotalNoteFrequency {
    pub fn schema() -> ParamSchema {
        rate_schema()
    }
}

impl TestRule for TotalNoteFrequency {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let duration = require_duration(sequence, "note frequency")?;
        let rate = sequence.len() as f64 / duration;
        Ok(Outcome::check(
            (self.min_per_second..=self.max_per_second).contains(&rate),
            json!({"notes_per_second": rate}),
        ))
    }
}

// ============================================================================
// note_frequency_per_instrument
// ============================================================================

/// Note-rate bounds applied to every instrument class present
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteFrequencyPerInstrument {
    pub min_per_second: f64,
    pub max_per_second: f64,
}

impl NoteFrequencyPerInstrument {
    pub fn schema() -> ParamSchema {
        rate_schema()
    }
}

impl TestRule for NoteFrequencyPerInstrument {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let duration = require_duration(sequence, "per-instrument note frequency")?;

        let mut counts: BTreeMap<InstrumentClass, usize> = BTreeMap::new();
        for note in sequence.notes() {
            *counts.entry(note.instrument_class()).or_default() += 1;
        }

        let mut rates = Map::new();
        let mut out_of_range = Vec::new();
        for (class, count) in counts {
            let rate = count as f64 / duration;
            if !(self.min_per_second..=self.max_per_second).contains(&rate) {
                out_of_range.push(class.as_str());
            }
            rates.insert(class.as_str().to_string(), json!(rate));
        }

        Ok(Outcome::check(
            out_of_range.is_empty(),
            json!({"notes_per_second": Value::Object(rates), "out_of_range": out_of_range}),
        ))
    }
}

// ============================================================================
// min_length
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinLength {
    pub min_seconds: f64,
}

impl MinLength {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![ParamSpec::required(
            "min_seconds",
            ParamType::non_negative(),
            "Shortest allowed duration in seconds",
        )])
    }
}

impl TestRule for MinLength {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let duration = sequence.duration();
        Ok(Outcome::check(
            duration >= self.min_seconds,
            json!({"duration_s": duration}),
        ))
    }
}

// ============================================================================
// max_programs / max_instruments
// ============================================================================

/// Percussion-channel notes are not counted; their program does not pick
/// an instrument
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaxPrograms {
    pub max: usize,
}

impl MaxPrograms {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![ParamSpec::required(
            "max",
            ParamType::at_least(1),
            "Most distinct program numbers allowed",
        )])
    }
}

impl TestRule for MaxPrograms {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let programs = sequence.programs();
        Ok(Outcome::check(
            programs.len() <= self.max,
            json!({"programs": programs}),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaxInstruments {
    pub max: usize,
}

impl MaxInstruments {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![ParamSpec::required(
            "max",
            ParamType::at_least(1),
            "Most distinct instrument classes allowed",
        )])
    }
}

impl TestRule for MaxInstruments {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let classes = sequence.instrument_classes();
        Ok(Outcome::check(
            classes.len() <= self.max,
            json!({"instruments": classes}),
        ))
    }
}
