//! Chorus - several modulated-delay voices summed with the dry signal

use super::{ms_to_frames, Effect};
use crate::buffer::AudioBuffer;
use crate::params::{ParamSet, ParamSpec};
use std::f64::consts::PI;

/// Multi-voice chorus
///
/// Each voice reads the input through a delay that swings between 0 and
/// `depth_ms` on a sine LFO; voices are spread evenly in LFO phase.
#[derive(Debug, Clone)]
pub struct Chorus {
    depth_ms: f32,
    rate_hz: f32,
    voices: usize,
    mix: f32,
}

impl Chorus {
    const DEPTH_MS: ParamSpec = ParamSpec::float("depth_ms", 0.5, 20.0, 5.0);
    const RATE_HZ: ParamSpec = ParamSpec::float("rate_hz", 0.1, 10.0, 1.5);
    const VOICES: ParamSpec = ParamSpec::int("voices", 1, 8, 2);
    const MIX: ParamSpec = ParamSpec::float("mix", 0.0, 1.0, 0.5);
    const SCHEMA: &'static [ParamSpec] = &[Self::DEPTH_MS, Self::RATE_HZ, Self::VOICES, Self::MIX];

    pub fn new() -> Self {
        Self {
            depth_ms: Self::DEPTH_MS.default_float(),
            rate_hz: Self::RATE_HZ.default_float(),
            voices: Self::VOICES.default_int() as usize,
            mix: Self::MIX.default_float(),
        }
    }

    pub fn set_depth_ms(&mut self, ms: f32) {
        self.depth_ms = Self::DEPTH_MS.clamp_float(ms);
    }

    pub fn set_rate_hz(&mut self, rate: f32) {
        self.rate_hz = Self::RATE_HZ.clamp_float(rate);
    }

    pub fn set_voices(&mut self, voices: i64) {
        self.voices = Self::VOICES.clamp_int(voices) as usize;
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = Self::MIX.clamp_float(mix);
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Chorus {
    fn name(&self) -> &'static str {
        "chorus"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::DEPTH_MS) {
            self.set_depth_ms(v);
        }
        if let Some(v) = params.float(&Self::RATE_HZ) {
            self.set_rate_hz(v);
        }
        if let Some(v) = params.int(&Self::VOICES) {
            self.set_voices(v);
        }
        if let Some(v) = params.float(&Self::MIX) {
            self.set_mix(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let n = input.frames();
        let depth = ms_to_frames(self.depth_ms, sample_rate) as f64;
        let step = 2.0 * PI * self.rate_hz as f64 / sample_rate.max(1) as f64;

        // Per-voice read index for every frame
        let indices: Vec<Vec<usize>> = (0..self.voices)
            .map(|v| {
                let phase = 2.0 * PI * v as f64 / self.voices as f64;
                (0..n)
                    .map(|i| {
                        let delay = (depth * (1.0 + (step * i as f64 + phase).sin()) / 2.0) as usize;
                        i.saturating_sub(delay)
                    })
                    .collect()
            })
            .collect();

        let norm = 1.0 / (1 + self.voices) as f32;
        super::map_channels(input, |ch| {
            (0..n)
                .map(|i| {
                    let wet = indices.iter().fold(ch[i], |acc, voice| acc + ch[voice[i]]) * norm;
                    ch[i] * (1.0 - self.mix) + wet * self.mix
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&Chorus::new());
    }

    #[test]
    fn test_dc_passes_unchanged() {
        let input = AudioBuffer::from_mono(vec![0.4; 2000]);
        let output = Chorus::new().process(&input, SR);
        assert!(output.samples().iter().all(|v| (v - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_voices_change_signal() {
        let input = mono_sine(2000.0, 4410);
        let mut chorus = Chorus::new();
        chorus.set_mix(1.0);
        chorus.set_voices(4);
        let output = chorus.process(&input, SR);
        let diff: f32 = input
            .samples()
            .iter()
            .zip(output.samples())
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff > 1.0);
    }
}
