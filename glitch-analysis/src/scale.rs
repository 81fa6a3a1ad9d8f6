//! Musical scales, keys and note quantization
//!
//! Scales are sets of semitone offsets from a key root. Quantization snaps a
//! continuous MIDI note to the nearest scale member while staying close to
//! the original octave.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pitch class names, index 0 = C
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference frequency for A4 (MIDI 69)
const A4_FREQ: f32 = 440.0;

/// Errors from parsing scale or key names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScaleError {
    #[error("Unknown scale: {0}")]
    UnknownScale(String),
    #[error("Unknown key: {0}")]
    UnknownKey(String),
}

/// Scale used for pitch quantization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scale {
    #[default]
    Chromatic,
    Major,
    Minor,
    Pentatonic,
    Blues,
    Dorian,
    Mixolydian,
}

impl Scale {
    /// Every scale, in display order
    pub const ALL: [Scale; 7] = [
        Scale::Chromatic,
        Scale::Major,
        Scale::Minor,
        Scale::Pentatonic,
        Scale::Blues,
        Scale::Dorian,
        Scale::Mixolydian,
    ];

    /// Semitone offsets from the root that belong to this scale
    pub fn intervals(self) -> &'static [i32] {
        match self {
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Pentatonic => &[0, 2, 4, 7, 9],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scale::Chromatic => "chromatic",
            Scale::Major => "major",
            Scale::Minor => "minor",
            Scale::Pentatonic => "pentatonic",
            Scale::Blues => "blues",
            Scale::Dorian => "dorian",
            Scale::Mixolydian => "mixolydian",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scale {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Scale::ALL
            .iter()
            .copied()
            .find(|scale| scale.name() == wanted)
            .ok_or_else(|| ScaleError::UnknownScale(s.to_string()))
    }
}

/// Key root as a pitch class (0-11, where 0 = C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Key(u8);

impl Key {
    pub fn new(pitch_class: u8) -> Self {
        Self(pitch_class % 12)
    }

    pub fn pitch_class(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Key {
    type Err = ScaleError;

    /// Parse "C", "F#", "Bb" (flats accepted, letter case ignored)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .ok_or_else(|| ScaleError::UnknownKey(s.to_string()))?;

        let natural: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(ScaleError::UnknownKey(s.to_string())),
        };

        let accidental = match chars.as_str() {
            "" => 0,
            "#" => 1,
            "b" => -1,
            _ => return Err(ScaleError::UnknownKey(s.to_string())),
        };

        Ok(Key::new((natural + accidental).rem_euclid(12) as u8))
    }
}

/// Convert a frequency in Hz to a continuous MIDI note number
///
/// Non-positive frequencies map to 0.
pub fn freq_to_midi(freq: f32) -> f32 {
    if freq <= 0.0 {
        return 0.0;
    }
    69.0 + 12.0 * (freq / A4_FREQ).log2()
}

/// Convert a (possibly fractional) MIDI note number to Hz
pub fn midi_to_freq(midi: f32) -> f32 {
    A4_FREQ * 2.0f32.powf((midi - 69.0) / 12.0)
}

/// Snap a continuous MIDI note to the nearest member of `scale` in `key`
///
/// The nearest interval is chosen by circular distance on the pitch-class
/// circle (first listed interval wins ties), rebuilt in the note's own
/// octave, then moved one octave up or down if that lands closer.
pub fn snap_to_scale(midi: f32, key: Key, scale: Scale) -> f32 {
    let rounded = midi.round() as i32;
    let root = key.pitch_class() as i32;
    let relative = (rounded.rem_euclid(12) - root).rem_euclid(12);

    let best = scale
        .intervals()
        .iter()
        .copied()
        .min_by_key(|&interval| {
            let d = (relative - interval).abs();
            d.min(12 - d)
        })
        .unwrap_or(0);

    let target_class = (best + root).rem_euclid(12);
    let mut target = (rounded.div_euclid(12) * 12 + target_class) as f32;

    if (target - midi).abs() > (target + 12.0 - midi).abs() {
        target += 12.0;
    } else if (target - midi).abs() > (target - 12.0 - midi).abs() {
        target -= 12.0;
    }

    target
}
