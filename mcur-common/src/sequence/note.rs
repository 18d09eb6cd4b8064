//! Note events

use super::instrument::InstrumentClass;
use serde::{Deserialize, Serialize};

/// MIDI channel reserved for percussion (channel 10, zero-based 9)
pub const DRUM_CHANNEL: u8 = 9;

/// Largest valid value for 7-bit MIDI data bytes
pub const MIDI_DATA_MAX: u8 = 127;

/// Largest valid zero-based channel number
pub const MIDI_CHANNEL_MAX: u8 = 15;

/// A single note event
///
/// Times are in seconds. Range checks happen when notes are collected into a
/// [`super::Sequence`]; a bare `Note` is just data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI pitch (0-127)
    pub pitch: u8,
    /// Onset time in seconds (>= 0)
    pub onset: f64,
    /// Duration in seconds (> 0)
    pub duration: f64,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// MIDI program number (0-127)
    pub program: u8,
    /// Zero-based MIDI channel (0-15)
    #[serde(default)]
    pub channel: u8,
}

impl Note {
    /// Create a note on channel 0
    pub fn new(pitch: u8, onset: f64, duration: f64, velocity: u8, program: u8) -> Self {
        Self {
            pitch,
            onset,
            duration,
            velocity,
            program,
            channel: 0,
        }
    }

    /// Create a note on the percussion channel
    pub fn drum(pitch: u8, onset: f64, duration: f64, velocity: u8) -> Self {
        Self {
            channel: DRUM_CHANNEL,
            ..Self::new(pitch, onset, duration, velocity, 0)
        }
    }

    /// Same note on another channel
    pub fn on_channel(self, channel: u8) -> Self {
        Self { channel, ..self }
    }

    /// Note-off time in seconds
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }

    /// Pitch class (0 = C .. 11 = B)
    pub fn pitch_class(&self) -> u8 {
        self.pitch % 12
    }

    /// Whether the note sits on the percussion channel
    pub fn is_drum(&self) -> bool {
        self.channel == DRUM_CHANNEL
    }

    /// Instrument class of this note
    ///
    /// Percussion-channel notes are always `Percussive`; every other note is
    /// classified by its program number. Out-of-range programs (rejected at
    /// sequence construction) fall back to `Sfx`.
    pub fn instrument_class(&self) -> InstrumentClass {
        if self.is_drum() {
            return InstrumentClass::Percussive;
        }
        InstrumentClass::from_program(self.program).unwrap_or(InstrumentClass::Sfx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_end_and_pitch_class() {
        let note = Note::new(61, 1.5, 0.25, 90, 0);
        assert_eq!(note.end(), 1.75);
        assert_eq!(note.pitch_class(), 1);
        assert_eq!(note.channel, 0);
    }

    #[test]
    fn test_drum_channel_is_percussive() {
        let kick = Note::drum(36, 0.0, 0.1, 100);
        assert!(kick.is_drum());
        assert_eq!(kick.instrument_class(), InstrumentClass::Percussive);

        let piano = Note::new(60, 0.0, 1.0, 80, 0);
        assert_eq!(piano.instrument_class(), InstrumentClass::Piano);
        assert_eq!(
            piano.on_channel(DRUM_CHANNEL).instrument_class(),
            InstrumentClass::Percussive
        );
    }

    #[test]
    fn test_channel_defaults_when_deserializing() {
        let note: Note = serde_json::from_str(
            r#"{"pitch": 64, "onset": 0.5, "duration": 0.5, "velocity": 70, "program": 24}"#,
        )
        .unwrap();
        assert_eq!(note.channel, 0);
        assert_eq!(note.instrument_class(), InstrumentClass::Guitar);
    }
}
