//! Note-event sequences
//!
//! A [`Sequence`] is the canonical in-memory form of one recording: notes
//! ordered by onset (stable for equal onsets) plus an end time. Every query
//! is a pure function of the sequence. Construction is the only place
//! invariants are checked; a `Sequence` that exists is well-formed.
//!
//! # Empty sequences
//! An empty sequence has duration 0 and every query returns an empty result.

pub mod instrument;
pub mod note;
pub mod window;

pub use instrument::InstrumentClass;
pub use note::{Note, DRUM_CHANNEL, MIDI_CHANNEL_MAX, MIDI_DATA_MAX};
pub use window::{AnchoredWindows, DurationWindows, Window};

use crate::error::{DataIntegrityError, Result};
use serde::Serialize;
use std::collections::BTreeSet;

/// An ordered, validated collection of notes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sequence {
    notes: Vec<Note>,
    end_time: f64,
}

impl Sequence {
    /// Build a sequence ending at the latest note-off
    pub fn new(notes: Vec<Note>) -> Result<Self> {
        Self::build(notes, None)
    }

    /// Build a sequence with an explicit end time
    ///
    /// The end time may extend past the last note-off (trailing silence) but
    /// may not cut a note short.
    pub fn with_end_time(notes: Vec<Note>, end_time: f64) -> Result<Self> {
        Self::build(notes, Some(end_time))
    }

    /// A sequence with no notes and zero duration
    pub fn empty() -> Self {
        Self {
            notes: Vec::new(),
            end_time: 0.0,
        }
    }

    fn build(mut notes: Vec<Note>, end_time: Option<f64>) -> Result<Self> {
        for (index, note) in notes.iter().enumerate() {
            validate_note(index, note)?;
        }

        let latest_note_off = notes.iter().map(Note::end).fold(0.0_f64, f64::max);
        let end_time = match end_time {
            Some(end) if !end.is_finite() || end < latest_note_off => {
                return Err(DataIntegrityError::InvalidEndTime {
                    end_time: end,
                    latest_note_off,
                });
            }
            Some(end) => end,
            None => latest_note_off,
        };

        // sort_by is stable: equal onsets keep insertion order
        notes.sort_by(|a, b| a.onset.total_cmp(&b.onset));

        Ok(Self { notes, end_time })
    }

    /// Notes ordered by onset
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Total duration in seconds (the sequence spans `[0, duration]`)
    pub fn duration(&self) -> f64 {
        self.end_time
    }

    /// Notes whose onset lies in `[t0, t1)`
    pub fn notes_in(&self, t0: f64, t1: f64) -> &[Note] {
        &self.notes[self.index_range(t0, t1)]
    }

    /// Distinct pitches among notes with onset in `[t0, t1)`
    pub fn pitches_in(&self, t0: f64, t1: f64) -> BTreeSet<u8> {
        self.notes_in(t0, t1).iter().map(|n| n.pitch).collect()
    }

    /// Distinct pitches across the whole sequence
    pub fn distinct_pitches(&self) -> BTreeSet<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }

    /// Distinct program numbers present
    ///
    /// Percussion-channel notes are skipped: their program number does not
    /// select an instrument.
    pub fn programs(&self) -> BTreeSet<u8> {
        self.notes
            .iter()
            .filter(|n| !n.is_drum())
            .map(|n| n.program)
            .collect()
    }

    /// Distinct instrument classes present
    pub fn instrument_classes(&self) -> BTreeSet<InstrumentClass> {
        self.notes.iter().map(Note::instrument_class).collect()
    }

    /// Window over `[t0, t1)`
    pub fn window(&self, t0: f64, t1: f64) -> Window<'_> {
        let range = self.index_range(t0, t1);
        Window {
            start: t0,
            end: t1,
            notes: &self.notes[range.clone()],
            range,
        }
    }

    /// Fixed-length windows starting at zero and advancing by `hop`
    pub fn windows_by_duration(&self, length: f64, hop: f64) -> DurationWindows<'_> {
        DurationWindows::new(self, length, hop)
    }

    /// Fixed-length windows anchored at each distinct onset
    pub fn windows_anchored(&self, length: f64) -> AnchoredWindows<'_> {
        AnchoredWindows::new(self, length)
    }

    /// Overlapping windows of `count` consecutive notes
    ///
    /// Yields nothing when `count` is zero or exceeds the note count.
    pub fn windows_by_count(&self, count: usize) -> impl Iterator<Item = &[Note]> + '_ {
        let size = if count == 0 || count > self.notes.len() {
            // slice::windows panics on 0; a size beyond the slice yields nothing
            self.notes.len() + 1
        } else {
            count
        };
        self.notes.windows(size)
    }

    /// Split `[0, duration)` into `count` equal-duration chunks by onset
    ///
    /// Yields `count` slices (some possibly empty) lazily, so a large count
    /// costs time but no memory. Yields nothing when `count` is zero or the
    /// sequence has zero duration.
    pub fn chunks_by_duration(&self, count: usize) -> impl ExactSizeIterator<Item = &[Note]> + '_ {
        let count = if self.end_time > 0.0 { count } else { 0 };
        let chunk_len = if count > 0 {
            self.end_time / count as f64
        } else {
            0.0
        };
        (0..count).map(move |i| {
            let start = i as f64 * chunk_len;
            // Last chunk is closed at the end so no onset is dropped to rounding
            let end = if i + 1 == count {
                f64::INFINITY
            } else {
                (i + 1) as f64 * chunk_len
            };
            self.notes_in(start, end)
        })
    }

    /// New sequence keeping only notes matching `keep`; the end time is preserved
    pub fn retain<F>(&self, mut keep: F) -> Sequence
    where
        F: FnMut(&Note) -> bool,
    {
        Sequence {
            notes: self.notes.iter().copied().filter(|n| keep(n)).collect(),
            end_time: self.end_time,
        }
    }

    fn index_range(&self, t0: f64, t1: f64) -> std::ops::Range<usize> {
        let lo = self.notes.partition_point(|n| n.onset < t0);
        let hi = self.notes.partition_point(|n| n.onset < t1).max(lo);
        lo..hi
    }
}

fn validate_note(index: usize, note: &Note) -> Result<()> {
    if note.pitch > MIDI_DATA_MAX {
        return Err(DataIntegrityError::PitchOutOfRange {
            index,
            pitch: note.pitch,
        });
    }
    if note.velocity > MIDI_DATA_MAX {
        return Err(DataIntegrityError::VelocityOutOfRange {
            index,
            velocity: note.velocity,
        });
    }
    if note.program > MIDI_DATA_MAX {
        return Err(DataIntegrityError::ProgramOutOfRange {
            index,
            program: note.program,
        });
    }
    if note.channel > MIDI_CHANNEL_MAX {
        return Err(DataIntegrityError::ChannelOutOfRange {
            index,
            channel: note.channel,
        });
    }
    if !note.onset.is_finite() || note.onset < 0.0 {
        return Err(DataIntegrityError::InvalidOnset {
            index,
            onset: note.onset,
        });
    }
    if !note.duration.is_finite() || note.duration <= 0.0 {
        return Err(DataIntegrityError::InvalidDuration {
            index,
            duration: note.duration,
        });
    }
    Ok(())
}
