//! Pitch analysis for glitch
//!
//! Provides autocorrelation pitch detection and the scale/key tables used
//! to quantize detected pitches to musical notes.

mod pitch;
mod scale;

pub use pitch::{PitchDetector, DEFAULT_FMAX, DEFAULT_FMIN};
pub use scale::{freq_to_midi, midi_to_freq, snap_to_scale, Key, Scale, ScaleError, NOTE_NAMES};
