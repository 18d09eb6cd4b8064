//! # MCUR Common Library
//!
//! Shared code for the curation workspace:
//! - Note-event model (`Note`, `Sequence`)
//! - Instrument class mapping from MIDI program numbers
//! - Windowed read-only queries over sequences
//! - Data-integrity error types

pub mod error;
pub mod sequence;

pub use error::{DataIntegrityError, Result};
pub use sequence::{InstrumentClass, Note, Sequence};
