//! Autotune: frame-wise pitch correction toward a key and scale
//!
//! The mono sum is cut into overlapping frames. Each voiced frame is read
//! back at the ratio that moves its detected pitch toward the nearest scale
//! note (scaled by `speed`), and the frames are overlap-added under a Hann
//! window. Successive read paths are kept a whole number of detected periods
//! apart so overlapping frames stay in phase.
//!
//! Stereo input is corrected through a per-sample gain: the ratio of the
//! corrected mono signal to the dry mono signal, clamped to [-3, 3].

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::{hann, read_linear, shift_formants};
use crate::params::{ParamSet, ParamSpec};
use glitch_analysis::{freq_to_midi, snap_to_scale, Key, PitchDetector, Scale};

/// Detected pitches outside this range pass through (Hz)
const MIN_FREQ: f32 = 60.0;
const MAX_FREQ: f32 = 1000.0;

/// Corrections smaller than this are skipped (semitones)
const MIN_CORRECTION: f32 = 0.05;

const STEREO_GAIN_LIMIT: f32 = 3.0;

/// Pitch is measured over at least this many samples around each frame, so
/// short hard-tune frames still see two periods of a 60 Hz note
const DETECTION_FRAME: usize = 2048;

/// Key roots, sharps and their flat spellings
const KEY_NAMES: [&str; 17] = [
    "C", "C#", "Db", "D", "D#", "Eb", "E", "F", "F#", "Gb", "G", "G#", "Ab", "A", "A#", "Bb", "B",
];

const SCALE_NAMES: [&str; 7] = [
    "chromatic",
    "major",
    "minor",
    "pentatonic",
    "blues",
    "dorian",
    "mixolydian",
];

#[derive(Debug, Clone)]
pub struct Autotune {
    speed: f32,
    key: Key,
    scale: Scale,
    mix: f32,
    formant_shift: f32,
    hard_tune: bool,
}

impl Autotune {
    const SPEED: ParamSpec = ParamSpec::float("speed", 0.0, 1.0, 0.8);
    const KEY: ParamSpec = ParamSpec::choice("key", &KEY_NAMES, "C");
    const SCALE: ParamSpec = ParamSpec::choice("scale", &SCALE_NAMES, "chromatic");
    const MIX: ParamSpec = ParamSpec::float("mix", 0.0, 1.0, 1.0);
    const FORMANT_SHIFT: ParamSpec = ParamSpec::float("formant_shift", -12.0, 12.0, 0.0);
    const HARD_TUNE: ParamSpec = ParamSpec::bool("hard_tune", false);
    const SCHEMA: &'static [ParamSpec] = &[
        Self::SPEED,
        Self::KEY,
        Self::SCALE,
        Self::MIX,
        Self::FORMANT_SHIFT,
        Self::HARD_TUNE,
    ];

    pub fn new() -> Self {
        Self {
            speed: Self::SPEED.default_float(),
            key: Key::default(),
            scale: Scale::default(),
            mix: Self::MIX.default_float(),
            formant_shift: Self::FORMANT_SHIFT.default_float(),
            hard_tune: Self::HARD_TUNE.default_bool(),
        }
    }

    /// Fraction of the distance to the target note covered per frame
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = Self::SPEED.clamp_float(speed);
    }

    pub fn set_key(&mut self, key: Key) {
        self.key = key;
    }

    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = Self::MIX.clamp_float(mix);
    }

    pub fn set_formant_shift(&mut self, semitones: f32) {
        self.formant_shift = Self::FORMANT_SHIFT.clamp_float(semitones);
    }

    /// Short frames and instant correction
    pub fn set_hard_tune(&mut self, on: bool) {
        self.hard_tune = on;
    }

    /// Window, hop and effective speed
    fn framing(&self) -> (usize, usize, f32) {
        if self.hard_tune {
            (1024, 512, 1.0)
        } else {
            (2048, 512, self.speed)
        }
    }

    /// Read ratio and detected period (frames) for one frame, if it needs work
    fn correction(
        &self,
        detector: &mut PitchDetector,
        frame: &[f32],
        speed: f32,
        sample_rate: u32,
    ) -> Option<(f64, f64)> {
        let freq = detector.detect(frame)?;
        if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
            return None;
        }
        let midi = freq_to_midi(freq);
        let shift = (snap_to_scale(midi, self.key, self.scale) - midi) * speed;
        if shift.abs() < MIN_CORRECTION {
            return None;
        }
        let ratio = 2.0f64.powf(shift as f64 / 12.0);
        Some((ratio, sample_rate as f64 / freq as f64))
    }

    /// Corrected copy of a mono signal
    fn retune(&self, mono: &[f32], sample_rate: u32) -> Vec<f32> {
        let n = mono.len();
        let (win, hop, speed) = self.framing();
        if n < win {
            return mono.to_vec();
        }

        let window = hann(win);
        let half = win as f64 / 2.0;
        let detect_len = DETECTION_FRAME.max(win).min(n);
        let mut detector = PitchDetector::with_range(sample_rate, detect_len, MIN_FREQ, MAX_FREQ);
        let mut output = vec![0.0f32; n];
        let mut weight = vec![0.0f32; n];
        // Input position read at the centre of the previous frame
        let mut previous: Option<f64> = None;
        let mut corrected = 0usize;

        let mut start = 0;
        while start + win <= n {
            let frame = &mono[start..start + win];
            let center = start as f64 + half;
            let detect_start = (start + win / 2)
                .saturating_sub(detect_len / 2)
                .min(n - detect_len);
            let detect_frame = &mono[detect_start..detect_start + detect_len];
            let anchor = match self.correction(&mut detector, detect_frame, speed, sample_rate) {
                Some((ratio, period)) => {
                    let ideal = previous.map_or(center, |p| p + hop as f64 * ratio);
                    let anchor = ideal - period * ((ideal - center) / period).round();
                    for (k, &w) in window.iter().enumerate() {
                        let pos = anchor + (k as f64 - half) * ratio;
                        output[start + k] += read_linear(mono, pos as f32) * w;
                        weight[start + k] += w;
                    }
                    corrected += 1;
                    anchor
                }
                None => {
                    for (k, (&x, &w)) in frame.iter().zip(window.iter()).enumerate() {
                        output[start + k] += x * w;
                        weight[start + k] += w;
                    }
                    center
                }
            };
            previous = Some(anchor);
            start += hop;
        }

        // Frames do not reach the very edges; keep the dry signal there
        for ((out, &w), &dry) in output.iter_mut().zip(weight.iter()).zip(mono.iter()) {
            *out = if w > 1e-6 { *out / w } else { dry };
        }

        tracing::trace!(corrected, frames = n, "autotune pass");
        shift_formants(&output, self.formant_shift, sample_rate)
    }
}

impl Default for Autotune {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Autotune {
    fn name(&self) -> &'static str {
        "autotune"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::SPEED) {
            self.set_speed(v);
        }
        if let Some(v) = params.choice(&Self::KEY) {
            if let Ok(key) = v.parse() {
                self.set_key(key);
            }
        }
        if let Some(v) = params.choice(&Self::SCALE) {
            if let Ok(scale) = v.parse() {
                self.set_scale(scale);
            }
        }
        if let Some(v) = params.float(&Self::MIX) {
            self.set_mix(v);
        }
        if let Some(v) = params.float(&Self::FORMANT_SHIFT) {
            self.set_formant_shift(v);
        }
        if let Some(v) = params.bool(&Self::HARD_TUNE) {
            self.set_hard_tune(v);
        }
    }

    fn min_frames(&self) -> usize {
        512
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let mono = input.to_mono();
        let tuned = self.retune(&mono, sample_rate);
        let mix = self.mix;

        if input.channels() == 1 {
            let mixed = mono
                .iter()
                .zip(tuned.iter())
                .map(|(dry, wet)| dry * (1.0 - mix) + wet * mix)
                .collect();
            return AudioBuffer::from_mono(mixed);
        }

        let gain: Vec<f32> = mono
            .iter()
            .zip(tuned.iter())
            .map(|(&dry, &wet)| {
                let ratio = if dry.abs() > 1e-6 { wet / dry } else { 1.0 };
                let ratio = ratio.clamp(-STEREO_GAIN_LIMIT, STEREO_GAIN_LIMIT);
                1.0 - mix + mix * ratio
            })
            .collect();
        super::map_channels(input, |ch| ch.iter().zip(gain.iter()).map(|(x, g)| x * g).collect())
    }
}
