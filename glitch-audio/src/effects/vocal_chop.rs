//! Vocal chop: a tempo-locked rhythmic gate
//!
//! One pattern step is a sixteenth note at `bpm`. The pattern loops across
//! the segment; active steps open the gate for `gate_shape` of the step
//! with short linear ramps. Active regions can be reversed on every other
//! hit and given a small random varispeed each.

use super::{seeded_rng, Effect};
use crate::buffer::AudioBuffer;
use crate::dsp::{fade_in, fade_out, micro_fade, read_linear};
use crate::params::{ParamSet, ParamSpec};
use rand::Rng;

/// Rhythm patterns, one entry per sixteenth step
const PATTERNS: &[(&str, &[u8])] = &[
    ("straight", &[1, 0, 1, 0, 1, 0, 1, 0]),
    ("dotted", &[1, 1, 0, 1, 1, 0, 1, 0]),
    ("triplet", &[1, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0]),
    ("glitch", &[1, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0]),
    ("staccato", &[1, 0, 0, 0, 1, 0, 0, 0]),
    ("syncopated", &[0, 1, 1, 0, 0, 1, 0, 1]),
    ("chaos", &[1, 0, 1, 1, 0, 0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 0]),
    ("rapid", &[1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0]),
];

const PATTERN_NAMES: &[&str] = &[
    "straight",
    "dotted",
    "triplet",
    "glitch",
    "staccato",
    "syncopated",
    "chaos",
    "rapid",
];

/// Shortest step (frames)
const MIN_STEP: usize = 64;

/// Shortest open gate (frames)
const MIN_ACTIVE: usize = 16;

/// Chops shorter than this keep their pitch
const MIN_PITCHED_CHOP: usize = 32;

/// Largest pitch excursion at full variation (semitones)
const MAX_VARIATION_SEMITONES: f32 = 2.0;

fn pattern_steps(name: &str) -> &'static [u8] {
    PATTERNS
        .iter()
        .find(|(n, _)| *n == name)
        .or_else(|| PATTERNS.iter().find(|(n, _)| *n == "glitch"))
        .map(|(_, steps)| *steps)
        .unwrap_or(&[1])
}

#[derive(Debug, Clone)]
pub struct VocalChop {
    bpm: f32,
    pattern: &'static str,
    gate_shape: f32,
    pitch_variation: f32,
    reverse_hits: bool,
    seed: i64,
}

impl VocalChop {
    const BPM: ParamSpec = ParamSpec::float("bpm", 40.0, 300.0, 140.0);
    const PATTERN: ParamSpec = ParamSpec::choice("pattern", PATTERN_NAMES, "glitch");
    const GATE_SHAPE: ParamSpec = ParamSpec::float("gate_shape", 0.1, 1.0, 0.8);
    const PITCH_VARIATION: ParamSpec = ParamSpec::float("pitch_variation", 0.0, 1.0, 0.0);
    const REVERSE_HITS: ParamSpec = ParamSpec::bool("reverse_hits", false);
    const SEED: ParamSpec = ParamSpec::int("seed", 0, i32::MAX as i64, 42);
    const SCHEMA: &'static [ParamSpec] = &[
        Self::BPM,
        Self::PATTERN,
        Self::GATE_SHAPE,
        Self::PITCH_VARIATION,
        Self::REVERSE_HITS,
        Self::SEED,
    ];

    pub fn new() -> Self {
        Self {
            bpm: Self::BPM.default_float(),
            pattern: Self::PATTERN.default_choice(),
            gate_shape: Self::GATE_SHAPE.default_float(),
            pitch_variation: Self::PITCH_VARIATION.default_float(),
            reverse_hits: Self::REVERSE_HITS.default_bool(),
            seed: Self::SEED.default_int(),
        }
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = Self::BPM.clamp_float(bpm);
    }

    /// Select a pattern by name; unknown names fall back to "glitch"
    pub fn set_pattern(&mut self, name: &str) {
        self.pattern = Self::PATTERN.resolve_choice(name);
    }

    /// Fraction of each step the gate stays open
    pub fn set_gate_shape(&mut self, shape: f32) {
        self.gate_shape = Self::GATE_SHAPE.clamp_float(shape);
    }

    pub fn set_pitch_variation(&mut self, amount: f32) {
        self.pitch_variation = Self::PITCH_VARIATION.clamp_float(amount);
    }

    pub fn set_reverse_hits(&mut self, on: bool) {
        self.reverse_hits = on;
    }

    pub fn set_seed(&mut self, seed: i64) {
        self.seed = Self::SEED.clamp_int(seed);
    }

    /// Sixteenth-note step in frames
    pub fn step_frames(&self, sample_rate: u32) -> usize {
        let beat = (60.0 / self.bpm * sample_rate as f32) as usize;
        (beat / 4).max(MIN_STEP)
    }

    /// Gate envelope and the `[start, end)` regions where it is open
    fn gate(&self, len: usize, sample_rate: u32) -> (Vec<f32>, Vec<(usize, usize)>) {
        let steps = pattern_steps(self.pattern);
        let step = self.step_frames(sample_rate);
        let active = ((step as f32 * self.gate_shape) as usize).max(MIN_ACTIVE);
        let fade = (active / 4).min(32);

        let mut gate = vec![0.0f32; len];
        let mut regions = Vec::new();
        for (k, start) in (0..len).step_by(step).enumerate() {
            if steps[k % steps.len()] == 0 {
                continue;
            }
            let end = (start + active).min(len);
            let region = &mut gate[start..end];
            region.iter_mut().for_each(|g| *g = 1.0);
            let n = fade.min(region.len());
            fade_in(region, n);
            if end.saturating_sub(fade) > start {
                fade_out(region, n);
            }
            regions.push((start, end));
        }
        (gate, regions)
    }

    /// Replay a chop at `rate` times normal speed, silent past its end
    fn varispeed(chop: &mut [f32], rate: f32) {
        let source = chop.to_vec();
        for (k, sample) in chop.iter_mut().enumerate() {
            *sample = read_linear(&source, k as f32 * rate);
        }
        micro_fade(chop, 32);
    }

    fn chop_channel(&self, ch: &[f32], gate: &[f32], regions: &[(usize, usize)]) -> Vec<f32> {
        let mut out: Vec<f32> = ch.iter().zip(gate.iter()).map(|(x, g)| x * g).collect();

        if self.reverse_hits {
            for &(start, end) in regions.iter().skip(1).step_by(2) {
                out[start..end].reverse();
            }
        }

        if self.pitch_variation > 0.01 {
            let mut rng = seeded_rng(self.seed);
            for &(start, end) in regions {
                if end - start < MIN_PITCHED_CHOP {
                    continue;
                }
                let shift = rng.gen_range(-self.pitch_variation..=self.pitch_variation);
                let rate = 2f32.powf(shift * MAX_VARIATION_SEMITONES / 12.0);
                Self::varispeed(&mut out[start..end], rate);
            }
        }

        micro_fade(&mut out, 64);
        out
    }
}

impl Default for VocalChop {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for VocalChop {
    fn name(&self) -> &'static str {
        "vocal_chop"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::BPM) {
            self.set_bpm(v);
        }
        if let Some(v) = params.choice(&Self::PATTERN) {
            self.pattern = v;
        }
        if let Some(v) = params.float(&Self::GATE_SHAPE) {
            self.set_gate_shape(v);
        }
        if let Some(v) = params.float(&Self::PITCH_VARIATION) {
            self.set_pitch_variation(v);
        }
        if let Some(v) = params.bool(&Self::REVERSE_HITS) {
            self.set_reverse_hits(v);
        }
        if let Some(v) = params.int(&Self::SEED) {
            self.set_seed(v);
        }
    }

    fn min_frames(&self) -> usize {
        64
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let (gate, regions) = self.gate(input.frames(), sample_rate);
        // Every channel draws the same random sequence
        super::map_channels(input, |ch| self.chop_channel(ch, &gate, &regions))
    }
}
