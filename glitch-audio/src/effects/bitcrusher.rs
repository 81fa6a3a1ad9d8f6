//! Bitcrusher effect - lo-fi digital degradation
//!
//! Quantizes to `bit_depth` bits and holds every `downsample`-th sample.

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::params::{ParamSet, ParamSpec};

/// Bitcrusher with bit depth and sample-and-hold rate reduction
#[derive(Debug, Clone)]
pub struct Bitcrusher {
    /// Bit depth (1 - 16 bits)
    bit_depth: u8,

    /// Sample rate reduction factor (1 - 64)
    /// 1 = no reduction, 10 = 1/10th sample rate, etc.
    downsample: usize,
}

impl Bitcrusher {
    const BIT_DEPTH: ParamSpec = ParamSpec::int("bit_depth", 1, 16, 8);
    const DOWNSAMPLE: ParamSpec = ParamSpec::int("downsample", 1, 64, 1);
    const SCHEMA: &'static [ParamSpec] = &[Self::BIT_DEPTH, Self::DOWNSAMPLE];

    pub fn new() -> Self {
        Self {
            bit_depth: Self::BIT_DEPTH.default_int() as u8,
            downsample: Self::DOWNSAMPLE.default_int() as usize,
        }
    }

    /// Set bit depth (1 - 16)
    pub fn set_bit_depth(&mut self, bits: i64) {
        self.bit_depth = Self::BIT_DEPTH.clamp_int(bits) as u8;
    }

    /// Get bit depth
    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    /// Set sample rate reduction factor (1 - 64)
    pub fn set_downsample(&mut self, factor: i64) {
        self.downsample = Self::DOWNSAMPLE.clamp_int(factor) as usize;
    }

    /// Get downsample factor
    pub fn downsample(&self) -> usize {
        self.downsample
    }

    /// Crush a sample to the current bit depth
    #[inline]
    fn crush(&self, sample: f32) -> f32 {
        let levels = (1u32 << self.bit_depth) as f32;
        (sample * levels).round() / levels
    }
}

impl Default for Bitcrusher {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Bitcrusher {
    fn name(&self) -> &'static str {
        "bitcrusher"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.int(&Self::BIT_DEPTH) {
            self.set_bit_depth(v);
        }
        if let Some(v) = params.int(&Self::DOWNSAMPLE) {
            self.set_downsample(v);
        }
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        super::map_channels(input, |ch| {
            let crushed: Vec<f32> = ch.iter().map(|&s| self.crush(s)).collect();
            if self.downsample <= 1 {
                return crushed;
            }
            // Hold every Nth sample for the following N - 1
            (0..crushed.len())
                .map(|i| crushed[i - i % self.downsample])
                .collect()
        })
    }
}
