//! Common error types for MCUR

use thiserror::Error;

/// Common result type for event-model operations
pub type Result<T> = std::result::Result<T, DataIntegrityError>;

/// Event-model invariant violations
///
/// Raised while constructing a [`crate::Sequence`]. The pipeline excludes the
/// offending sequence and counts it separately from quality-gate rejections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataIntegrityError {
    /// Pitch outside the MIDI range 0-127
    #[error("Note {index}: pitch {pitch} out of range [0, 127]")]
    PitchOutOfRange { index: usize, pitch: u8 },

    /// Velocity outside the MIDI range 0-127
    #[error("Note {index}: velocity {velocity} out of range [0, 127]")]
    VelocityOutOfRange { index: usize, velocity: u8 },

    /// Program number outside 0-127
    #[error("Note {index}: program {program} out of range [0, 127]")]
    ProgramOutOfRange { index: usize, program: u8 },

    /// Channel outside 0-15
    #[error("Note {index}: channel {channel} out of range [0, 15]")]
    ChannelOutOfRange { index: usize, channel: u8 },

    /// Onset is negative, NaN or infinite
    #[error("Note {index}: invalid onset {onset}")]
    InvalidOnset { index: usize, onset: f64 },

    /// Duration is zero, negative, NaN or infinite
    #[error("Note {index}: invalid duration {duration}")]
    InvalidDuration { index: usize, duration: f64 },

    /// Explicit end time precedes a note-off or is not a finite non-negative number
    #[error("End time {end_time} is invalid (latest note-off at {latest_note_off})")]
    InvalidEndTime { end_time: f64, latest_note_off: f64 },

    /// Input record could not be decoded into notes at all
    /// (e.g. a pitch of 300 does not fit a MIDI data byte)
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}
