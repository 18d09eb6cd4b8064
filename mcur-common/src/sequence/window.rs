//! Sliding windows over a sequence
//!
//! Two time-based window families are provided:
//! - [`DurationWindows`]: fixed length and hop, starting at time zero
//! - [`AnchoredWindows`]: fixed length, one window per distinct note onset,
//!   clamped so every window lies inside `[0, end_time]`
//!
//! Anchored windows are what the density-style predicates use: any interval
//! holding the maximum number of notes can be shifted right until it starts
//! at a note onset, so scanning onset-anchored windows finds every peak.

use super::note::Note;
use super::Sequence;
use std::collections::BTreeSet;
use std::ops::Range;

/// A half-open time interval `[start, end)` and the notes whose onset falls in it
#[derive(Debug, Clone, PartialEq)]
pub struct Window<'a> {
    pub start: f64,
    pub end: f64,
    /// Index range of the window's notes in the parent sequence
    pub range: Range<usize>,
    pub notes: &'a [Note],
}

impl<'a> Window<'a> {
    /// Window length in seconds
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn distinct_pitches(&self) -> BTreeSet<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }
}

/// Fixed-length windows advanced by a fixed hop from time zero
///
/// Yields windows while `start < end_time`; an empty sequence yields nothing.
pub struct DurationWindows<'a> {
    sequence: &'a Sequence,
    length: f64,
    hop: f64,
    step: usize,
}

impl<'a> DurationWindows<'a> {
    pub(super) fn new(sequence: &'a Sequence, length: f64, hop: f64) -> Self {
        Self {
            sequence,
            length,
            hop,
            step: 0,
        }
    }
}

impl<'a> Iterator for DurationWindows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if !(self.length > 0.0 && self.hop > 0.0) {
            return None;
        }
        // Multiply rather than accumulate so long sequences don't drift
        let start = self.step as f64 * self.hop;
        if start >= self.sequence.duration() {
            return None;
        }
        self.step += 1;
        Some(self.sequence.window(start, start + self.length))
    }
}

/// One window per distinct note onset, clamped inside the sequence
///
/// The effective length is `min(length, end_time)`. A window anchored at an
/// onset too close to the end is pulled back so it ends exactly at
/// `end_time`; consecutive anchors that clamp to the same start are yielded
/// once. Window starts (and ends) are non-decreasing.
pub struct AnchoredWindows<'a> {
    sequence: &'a Sequence,
    length: f64,
    next_note: usize,
    last_start: Option<f64>,
}

impl<'a> AnchoredWindows<'a> {
    pub(super) fn new(sequence: &'a Sequence, length: f64) -> Self {
        let effective = if length > 0.0 {
            length.min(sequence.duration())
        } else {
            0.0
        };
        Self {
            sequence,
            length: effective,
            next_note: 0,
            last_start: None,
        }
    }

    /// Effective window length after clamping to the sequence duration
    pub fn effective_length(&self) -> f64 {
        self.length
    }
}

impl<'a> Iterator for AnchoredWindows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.length <= 0.0 {
            return None;
        }
        let notes = self.sequence.notes();
        let latest_start = (self.sequence.duration() - self.length).max(0.0);

        while self.next_note < notes.len() {
            let onset = notes[self.next_note].onset;
            self.next_note += 1;

            let start = onset.min(latest_start);
            if self.last_start == Some(start) {
                continue;
            }
            self.last_start = Some(start);
            return Some(self.sequence.window(start, start + self.length));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metronome(count: usize, spacing: f64) -> Sequence {
        let notes = (0..count)
            .map(|i| Note::new(60 + (i % 3) as u8, i as f64 * spacing, spacing / 2.0, 80, 0))
            .collect();
        Sequence::new(notes).unwrap()
    }

    #[test]
    fn test_duration_windows_cover_sequence() {
        let seq = metronome(10, 1.0); // onsets 0..9, end 9.5
        let windows: Vec<_> = seq.windows_by_duration(4.0, 4.0).collect();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].note_count(), 4);
        assert_eq!(windows[1].note_count(), 4);
        assert_eq!(windows[2].note_count(), 2);
        assert_eq!(windows[2].start, 8.0);
    }

    #[test]
    fn test_duration_windows_reject_non_positive_length() {
        let seq = metronome(4, 1.0);
        assert_eq!(seq.windows_by_duration(0.0, 1.0).count(), 0);
        assert_eq!(seq.windows_by_duration(1.0, -1.0).count(), 0);
    }

    #[test]
    fn test_anchored_windows_clamp_to_end() {
        let seq = metronome(10, 1.0); // end 9.5
        let windows: Vec<_> = seq.windows_anchored(3.0).collect();

        // Anchors at 0..=6 fit; 7, 8, 9 all clamp to 6.5 and collapse to one window
        assert_eq!(windows.len(), 8);
        assert_eq!(windows.last().unwrap().start, 6.5);
        assert_eq!(windows.last().unwrap().end, 9.5);
        assert!(windows.iter().all(|w| (w.length() - 3.0).abs() < 1e-12));
        assert!(windows.windows(2).all(|p| p[0].start < p[1].start));
    }

    #[test]
    fn test_anchored_windows_shorter_sequence_uses_whole_span() {
        let seq = metronome(5, 1.0); // end 4.5
        let mut windows = seq.windows_anchored(45.0);
        assert_eq!(windows.effective_length(), 4.5);
        let first = windows.next().unwrap();
        assert_eq!(first.start, 0.0);
        assert_eq!(first.note_count(), 5);
        assert!(windows.next().is_none());
    }

    #[test]
    fn test_anchored_windows_empty_sequence() {
        let seq = Sequence::empty();
        assert_eq!(seq.windows_anchored(10.0).count(), 0);
    }

    #[test]
    fn test_window_ranges_index_parent() {
        let seq = metronome(6, 1.0);
        for window in seq.windows_anchored(2.0) {
            assert_eq!(&seq.notes()[window.range.clone()], window.notes);
        }
    }
}
