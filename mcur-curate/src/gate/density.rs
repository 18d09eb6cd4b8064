//! Windowed density predicates
//!
//! Both rules scan onset-anchored windows (see
//! [`mcur_common::sequence::AnchoredWindows`]). Window index ranges only move
//! forward, so per-pitch counts are maintained incrementally: each note is
//! added once and removed once over the whole scan.

use crate::error::RuleError;
use crate::registry::{ParamSchema, ParamSpec, ParamType};
use crate::types::{Outcome, TestRule};
use mcur_common::sequence::Window;
use mcur_common::{Note, Sequence};
use serde::Deserialize;
use serde_json::{json, Value};
use std::ops::ControlFlow;

/// Note counts per pitch over the current window
struct PitchCounts {
    counts: [u32; 128],
    distinct: usize,
    total: usize,
}

impl PitchCounts {
    fn new() -> Self {
        Self {
            counts: [0; 128],
            distinct: 0,
            total: 0,
        }
    }

    fn add(&mut self, note: &Note) {
        let slot = &mut self.counts[usize::from(note.pitch)];
        if *slot == 0 {
            self.distinct += 1;
        }
        *slot += 1;
        self.total += 1;
    }

    fn remove(&mut self, note: &Note) {
        let slot = &mut self.counts[usize::from(note.pitch)];
        *slot -= 1;
        if *slot == 0 {
            self.distinct -= 1;
        }
        self.total -= 1;
    }

    /// Most frequent pitch and its count
    fn busiest_pitch(&self) -> (u8, u32) {
        let mut best = (0u8, 0u32);
        for (pitch, &count) in self.counts.iter().enumerate() {
            if count > best.1 {
                best = (pitch as u8, count);
            }
        }
        best
    }
}

/// Visit every anchored window with its pitch counts
///
/// Returns the effective window length and the visitor's break value, if any.
fn scan_windows<F>(sequence: &Sequence, length: f64, mut visit: F) -> (f64, Option<Value>)
where
    F: FnMut(&Window<'_>, &PitchCounts) -> ControlFlow<Value>,
{
    let notes = sequence.notes();
    let windows = sequence.windows_anchored(length);
    let effective = windows.effective_length();

    let mut counts = PitchCounts::new();
    let (mut lo, mut hi) = (0usize, 0usize);
    for window in windows {
        while hi < window.range.end {
            counts.add(&notes[hi]);
            hi += 1;
        }
        while lo < window.range.start {
            counts.remove(&notes[lo]);
            lo += 1;
        }
        if let ControlFlow::Break(detail) = visit(&window, &counts) {
            return (effective, Some(detail));
        }
    }
    (effective, None)
}

// ============================================================================
// note_density_in_interval
// ============================================================================

/// Notes a window may always hold, however short it is
pub const MIN_WINDOW_ALLOWANCE: f64 = 1.0;

/// Notes allowed in a window of `length` seconds at `rate` per second
///
/// Windows are clamped to the sequence duration, so a very short sequence
/// has a very short window; the floor keeps a lone note from exceeding it.
fn allowance(rate: f64, length: f64) -> f64 {
    (rate * length).max(MIN_WINDOW_ALLOWANCE)
}

/// Upper bound on note density inside any window
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteDensityInInterval {
    pub max_notes_per_second: f64,
    pub max_notes_per_second_per_pitch: f64,
    pub interval_len_s: f64,
}

impl NoteDensityInInterval {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::required(
                "max_notes_per_second",
                ParamType::positive(),
                "Notes per second allowed in any window",
            ),
            ParamSpec::required(
                "max_notes_per_second_per_pitch",
                ParamType::positive(),
                "Notes per second allowed for a single pitch in any window",
            ),
            ParamSpec::required(
                "interval_len_s",
                ParamType::positive(),
                "Window length in seconds (clamped to the sequence duration)",
            ),
        ])
    }
}

impl TestRule for NoteDensityInInterval {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let mut peak_notes = 0usize;
        let mut peak_pitch_notes = 0u32;

        let (length, failure) = scan_windows(sequence, self.interval_len_s, |window, counts| {
            let max_notes = allowance(self.max_notes_per_second, window.length());
            let max_pitch_notes = allowance(self.max_notes_per_second_per_pitch, window.length());
            let (pitch, pitch_notes) = counts.busiest_pitch();

            peak_notes = peak_notes.max(counts.total);
            peak_pitch_notes = peak_pitch_notes.max(pitch_notes);

            if counts.total as f64 > max_notes {
                return ControlFlow::Break(json!({
                    "window_start_s": window.start,
                    "window_len_s": window.length(),
                    "notes": counts.total,
                    "max_notes": max_notes,
                }));
            }
            if f64::from(pitch_notes) > max_pitch_notes {
                return ControlFlow::Break(json!({
                    "window_start_s": window.start,
                    "window_len_s": window.length(),
                    "pitch": pitch,
                    "pitch_notes": pitch_notes,
                    "max_pitch_notes": max_pitch_notes,
                }));
            }
            ControlFlow::Continue(())
        });

        Ok(match failure {
            Some(detail) => Outcome::fail(detail),
            None => Outcome::pass(json!({
                "window_len_s": length,
                "peak_notes": peak_notes,
                "peak_pitch_notes": peak_pitch_notes,
            })),
        })
    }
}

// ============================================================================
// unique_pitch_count_in_interval
// ============================================================================

/// Lower bound on distinct pitches inside every window
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniquePitchCountInInterval {
    pub min_unique_pitch_cnt: usize,
    pub interval_len_s: f64,
}

impl UniquePitchCountInInterval {
    pub fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::required(
                "min_unique_pitch_cnt",
                ParamType::at_least(1),
                "Distinct pitches required in every window",
            ),
            ParamSpec::required(
                "interval_len_s",
                ParamType::positive(),
                "Window length in seconds (clamped to the sequence duration)",
            ),
        ])
    }
}

impl TestRule for UniquePitchCountInInterval {
    fn evaluate(&self, sequence: &Sequence) -> Result<Outcome, RuleError> {
        let mut fewest: Option<usize> = None;

        let (length, failure) = scan_windows(sequence, self.interval_len_s, |window, counts| {
            fewest = Some(fewest.map_or(counts.distinct, |f| f.min(counts.distinct)));
            if counts.distinct < self.min_unique_pitch_cnt {
                return ControlFlow::Break(json!({
                    "window_start_s": window.start,
                    "window_len_s": window.length(),
                    "unique_pitches": counts.distinct,
                    "min_unique_pitches": self.min_unique_pitch_cnt,
                }));
            }
            ControlFlow::Continue(())
        });

        Ok(match failure {
            Some(detail) => Outcome::fail(detail),
            None => Outcome::pass(json!({
                "window_len_s": length,
                "fewest_unique_pitches": fewest,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn density(rate: f64, per_pitch: f64, len: f64) -> NoteDensityInInterval {
        NoteDensityInInterval {
            max_notes_per_second: rate,
            max_notes_per_second_per_pitch: per_pitch,
            interval_len_s: len,
        }
    }

    /// One note every `step` seconds for `count` notes
    fn repeated(pitch: u8, step: f64, count: usize) -> Sequence {
        Sequence::new(
            (0..count)
                .map(|i| Note::new(pitch, i as f64 * step, step, 80, 0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_repeated_pitch_fails_per_pitch_limit() {
        // 50 notes of pitch 60 over 5 s: window clamps to 5 s, allowing 30 per pitch
        let seq = repeated(60, 0.1, 50);
        let outcome = density(30.0, 6.0, 45.0).evaluate(&seq).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail["pitch"], 60);
        assert_eq!(outcome.detail["pitch_notes"], 50);
    }

    #[test]
    fn test_total_limit() {
        // 4 distinct pitches cycling, 20 notes/s
        let notes = (0..40)
            .map(|i| Note::new(60 + (i % 4) as u8, i as f64 * 0.05, 0.05, 80, 0))
            .collect();
        let seq = Sequence::new(notes).unwrap();
        let outcome = density(10.0, 100.0, 1.0).evaluate(&seq).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail["notes"], 20);

        assert!(density(25.0, 100.0, 1.0).evaluate(&seq).unwrap().passed);
    }

    #[test]
    fn test_sparse_sequence_passes() {
        let seq = repeated(60, 1.0, 10);
        let outcome = density(5.0, 2.0, 2.0).evaluate(&seq).unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.detail["peak_notes"], 2);
    }

    #[test]
    fn test_lone_short_note_passes() {
        let seq = Sequence::new(vec![Note::new(60, 0.0, 0.1, 80, 0)]).unwrap();
        let outcome = density(30.0, 6.0, 45.0).evaluate(&seq).unwrap();
        assert!(outcome.passed, "{}", outcome.detail);
        assert_eq!(outcome.detail["window_len_s"], 0.1);
    }

    #[test]
    fn test_short_sequence_still_limited() {
        // three repeats of one pitch in 0.3 s at 6/s allow under two
        let seq = repeated(60, 0.1, 3);
        let outcome = density(30.0, 6.0, 45.0).evaluate(&seq).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail["pitch_notes"], 3);

        // two notes in 0.1 s: the floor allows one, not 0.6
        let pair = Sequence::new(vec![Note::new(60, 0.0, 0.1, 80, 0), Note::new(60, 0.05, 0.05, 80, 0)])
            .unwrap();
        let outcome = density(30.0, 6.0, 45.0).evaluate(&pair).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail["max_pitch_notes"], MIN_WINDOW_ALLOWANCE);
    }

    #[test]
    fn test_empty_sequence_passes() {
        let outcome = density(1.0, 1.0, 10.0).evaluate(&Sequence::empty()).unwrap();
        assert!(outcome.passed);
    }

    #[test]
    fn test_burst_in_middle_is_found() {
        let mut notes: Vec<Note> = (0..10).map(|i| Note::new(60, i as f64 * 2.0, 0.5, 80, 0)).collect();
        notes.extend((0..12).map(|i| Note::new(40 + i as u8, 7.0 + i as f64 * 0.01, 0.1, 80, 0)));
        let seq = Sequence::new(notes).unwrap();
        let outcome = density(5.0, 5.0, 1.0).evaluate(&seq).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail["window_start_s"], 7.0);
    }

    #[test]
    fn test_unique_pitch_windows() {
        let notes = vec![
            Note::new(60, 0.0, 0.5, 80, 0),
            Note::new(62, 0.5, 0.5, 80, 0),
            Note::new(64, 1.0, 0.5, 80, 0),
            Note::new(64, 5.0, 0.5, 80, 0),
            Note::new(64, 5.5, 0.5, 80, 0),
        ];
        let seq = Sequence::new(notes).unwrap();
        let rule = UniquePitchCountInInterval {
            min_unique_pitch_cnt: 2,
            interval_len_s: 1.0,
        };
        let outcome = rule.evaluate(&seq).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.detail["unique_pitches"], 1);

        let lenient = UniquePitchCountInInterval {
            min_unique_pitch_cnt: 1,
            interval_len_s: 1.0,
        };
        assert!(lenient.evaluate(&seq).unwrap().passed);
    }

    #[test]
    fn test_unique_pitch_empty_passes() {
        let rule = UniquePitchCountInInterval {
            min_unique_pitch_cnt: 3,
            interval_len_s: 5.0,
        };
        assert!(rule.evaluate(&Sequence::empty()).unwrap().passed);
    }
}
