//! Instrument classes
//!
//! General MIDI groups the 128 program numbers into 16 families of eight
//! programs each. Every valid program maps to exactly one class.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse instrument category derived from a MIDI program number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Piano,
    Chromatic,
    Organ,
    Guitar,
    Bass,
    Strings,
    Ensemble,
    Brass,
    Reed,
    Pipe,
    SynthLead,
    SynthPad,
    SynthEffect,
    Ethnic,
    Percussive,
    Sfx,
}

impl InstrumentClass {
    /// All classes in program order
    pub const ALL: [InstrumentClass; 16] = [
        InstrumentClass::Piano,
        InstrumentClass::Chromatic,
        InstrumentClass::Organ,
        InstrumentClass::Guitar,
        InstrumentClass::Bass,
        InstrumentClass::Strings,
        InstrumentClass::Ensemble,
        InstrumentClass::Brass,
        InstrumentClass::Reed,
        InstrumentClass::Pipe,
        InstrumentClass::SynthLead,
        InstrumentClass::SynthPad,
        InstrumentClass::SynthEffect,
        InstrumentClass::Ethnic,
        InstrumentClass::Percussive,
        InstrumentClass::Sfx,
    ];

    /// Number of programs in each class
    pub const PROGRAMS_PER_CLASS: u8 = 8;

    /// Map a program number (0-127) to its class
    ///
    /// Returns `None` for program numbers above 127.
    pub fn from_program(program: u8) -> Option<Self> {
        Self::ALL
            .get(usize::from(program / Self::PROGRAMS_PER_CLASS))
            .copied()
    }

    /// Inclusive program range covered by this class
    pub fn program_range(self) -> std::ops::RangeInclusive<u8> {
        let first = self as u8 * Self::PROGRAMS_PER_CLASS;
        first..=first + (Self::PROGRAMS_PER_CLASS - 1)
    }

    /// Configuration name (snake_case)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Piano => "piano",
            Self::Chromatic => "chromatic",
            Self::Organ => "organ",
            Self::Guitar => "guitar",
            Self::Bass => "bass",
            Self::Strings => "strings",
            Self::Ensemble => "ensemble",
            Self::Brass => "brass",
            Self::Reed => "reed",
            Self::Pipe => "pipe",
            Self::SynthLead => "synth_lead",
            Self::SynthPad => "synth_pad",
            Self::SynthEffect => "synth_effect",
            Self::Ethnic => "ethnic",
            Self::Percussive => "percussive",
            Self::Sfx => "sfx",
        }
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| format!("unknown instrument class '{}'", s))
    }
}
