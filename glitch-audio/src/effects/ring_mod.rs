//! Ring modulation against a fixed sine carrier

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::params::{ParamSet, ParamSpec};
use std::f64::consts::PI;

/// Multiplies the signal by a sine carrier and blends with the dry signal
#[derive(Debug, Clone)]
pub struct RingMod {
    frequency: f32,
    mix: f32,
}

impl RingMod {
    const FREQUENCY: ParamSpec = ParamSpec::float("frequency", 20.0, 5000.0, 440.0);
    const MIX: ParamSpec = ParamSpec::float("mix", 0.0, 1.0, 0.7);
    const SCHEMA: &'static [ParamSpec] = &[Self::FREQUENCY, Self::MIX];

    pub fn new() -> Self {
        Self {
            frequency: Self::FREQUENCY.default_float(),
            mix: Self::MIX.default_float(),
        }
    }

    /// Set carrier frequency in Hz
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = Self::FREQUENCY.clamp_float(hz);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = Self::MIX.clamp_float(mix);
    }
}

impl Default for RingMod {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for RingMod {
    fn name(&self) -> &'static str {
        "ring_mod"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::FREQUENCY) {
            self.set_frequency(v);
        }
        if let Some(v) = params.float(&Self::MIX) {
            self.set_mix(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let step = 2.0 * PI * self.frequency as f64 / sample_rate.max(1) as f64;
        super::map_channels(input, |ch| {
            ch.iter()
                .enumerate()
                .map(|(i, &x)| {
                    let carrier = (step * i as f64).sin() as f32;
                    x * (1.0 - self.mix) + x * carrier * self.mix
                })
                .collect()
        })
    }
}
