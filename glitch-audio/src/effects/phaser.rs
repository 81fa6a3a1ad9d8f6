//! Phaser - cascaded first-order all-pass stages swept by an LFO
//!
//! Coefficients are recomputed once per ~10 ms block. Each stage keeps its
//! delay-line value across blocks so the sweep stays continuous inside one
//! call; nothing carries over between calls.

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::params::{ParamSet, ParamSpec};
use std::f64::consts::PI;

/// Bottom of the LFO sweep (Hz)
const MIN_FREQ: f64 = 100.0;

/// Top of the LFO sweep at full depth (Hz)
const MAX_FREQ: f64 = 4000.0;

/// Extra center-frequency offset per stage (Hz)
const STAGE_OFFSET: f64 = 200.0;

/// One first-order all-pass `H(z) = (a + z^-1) / (1 + a z^-1)`
#[derive(Debug, Clone, Copy, Default)]
struct AllPass {
    z: f64,
}

impl AllPass {
    #[inline]
    fn tick(&mut self, x: f64, a: f64) -> f64 {
        let y = a * x + self.z;
        self.z = x - a * y;
        y
    }
}

/// Coefficient for a first-order all-pass centered at `freq`
#[inline]
fn allpass_coefficient(freq: f64, sample_rate: f64) -> f64 {
    let freq = freq.clamp(20.0, sample_rate / 2.0 - 100.0);
    let omega = (PI * freq / sample_rate).clamp(0.001, PI * 0.49);
    let t = omega.tan();
    (t - 1.0) / (t + 1.0)
}

#[derive(Debug, Clone)]
pub struct Phaser {
    rate_hz: f32,
    depth: f32,
    stages: usize,
    mix: f32,
}

impl Phaser {
    const RATE_HZ: ParamSpec = ParamSpec::float("rate_hz", 0.05, 10.0, 0.5);
    const DEPTH: ParamSpec = ParamSpec::float("depth", 0.0, 1.0, 0.7);
    const STAGES: ParamSpec = ParamSpec::int("stages", 1, 12, 4);
    const MIX: ParamSpec = ParamSpec::float("mix", 0.0, 1.0, 0.7);
    const SCHEMA: &'static [ParamSpec] = &[Self::RATE_HZ, Self::DEPTH, Self::STAGES, Self::MIX];

    pub fn new() -> Self {
        Self {
            rate_hz: Self::RATE_HZ.default_float(),
            depth: Self::DEPTH.default_float(),
            stages: Self::STAGES.default_int() as usize,
            mix: Self::MIX.default_float(),
        }
    }

    pub fn set_rate_hz(&mut self, rate: f32) {
        self.rate_hz = Self::RATE_HZ.clamp_float(rate);
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = Self::DEPTH.clamp_float(depth);
    }

    pub fn set_stages(&mut self, stages: i64) {
        self.stages = Self::STAGES.clamp_int(stages) as usize;
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = Self::MIX.clamp_float(mix);
    }

    /// Run every stage over one channel
    fn phase_channel(&self, dry: &[f32], sample_rate: u32) -> Vec<f32> {
        let sr = sample_rate.max(1) as f64;
        let n = dry.len();
        let block = (sample_rate as usize / 100).max(64);
        let lfo_step = 2.0 * PI * self.rate_hz as f64 / sr;
        let sweep = (MAX_FREQ - MIN_FREQ) * self.depth as f64 * 0.5;

        let mut wet: Vec<f64> = dry.iter().map(|&x| x as f64).collect();
        for stage in 0..self.stages {
            let offset = stage as f64 * STAGE_OFFSET;
            let mut allpass = AllPass::default();
            for start in (0..n).step_by(block) {
                let lfo = MIN_FREQ + sweep * (1.0 + (lfo_step * start as f64).sin());
                let a = allpass_coefficient(lfo + offset, sr);
                let end = (start + block).min(n);
                for sample in &mut wet[start..end] {
                    *sample = allpass.tick(*sample, a);
                }
            }
        }

        let mix = self.mix as f64;
        dry.iter()
            .zip(wet.iter())
            .map(|(&d, &w)| (d as f64 * (1.0 - mix) + w * mix) as f32)
            .collect()
    }
}

impl Default for Phaser {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Phaser {
    fn name(&self) -> &'static str {
        "phaser"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::RATE_HZ) {
            self.set_rate_hz(v);
        }
        if let Some(v) = params.float(&Self::DEPTH) {
            self.set_depth(v);
        }
        if let Some(v) = params.int(&Self::STAGES) {
            self.set_stages(v);
        }
        if let Some(v) = params.float(&Self::MIX) {
            self.set_mix(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        super::map_channels(input, |ch| self.phase_channel(ch, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&Phaser::new());
    }

    #[test]
    fn test_allpass_keeps_magnitude() {
        // A fully wet phaser with a frozen LFO is a pure all-pass cascade
        let mut phaser = Phaser::new();
        phaser.set_mix(1.0);
        phaser.set_depth(0.0);
        phaser.set_stages(6);
        let input = mono_sine(1000.0, 22050);
        let output = phaser.process(&input, SR);
        let a = rms(&input.samples()[11025..]);
        let b = rms(&output.samples()[11025..]);
        assert!((a - b).abs() < 0.01, "in {} out {}", a, b);
    }

    #[test]
    fn test_half_mix_creates_notches() {
        // Dry + all-pass cancels near the stage phase crossover
        let mut phaser = Phaser::new();
        phaser.set_mix(0.5);
        phaser.set_depth(0.0);
        phaser.set_stages(2);
        let input = mono_sine(100.0, 22050);
        let output = phaser.process(&input, SR);
        assert!(rms(&output.samples()[11025..]) < rms(&input.samples()[11025..]) * 0.9);
    }

    #[test]
    fn test_zero_mix_is_dry() {
        let mut phaser = Phaser::new();
        phaser.set_mix(0.0);
        let input = stereo_sine(440.0, 2000);
        assert_eq!(phaser.process(&input, SR), input);
    }

    #[test]
    fn test_coefficient_is_stable() {
        for f in [0.0, 20.0, 1000.0, 30_000.0] {
            let a = allpass_coefficient(f, 44100.0);
            assert!(a.abs() < 1.0);
        }
    }
}
