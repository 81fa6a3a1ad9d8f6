//! Time stretch: change segment duration, with or without the pitch following
//!
//! Plain mode is a band-limited resample (tape-speed style, pitch moves with
//! the speed). With `preserve_pitch` the phase vocoder changes duration only.

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::{fft_resample, micro_fade_buffer, stretch_to_length};
use crate::params::{ParamSet, ParamSpec};

/// Shortest stretched segment (frames)
const MIN_OUTPUT: usize = 64;

#[derive(Debug, Clone)]
pub struct TimeStretch {
    factor: f32,
    preserve_pitch: bool,
}

impl TimeStretch {
    const FACTOR: ParamSpec = ParamSpec::float("factor", 0.1, 4.0, 1.0);
    const PRESERVE_PITCH: ParamSpec = ParamSpec::bool("preserve_pitch", false);
    const SCHEMA: &'static [ParamSpec] = &[Self::FACTOR, Self::PRESERVE_PITCH];

    pub fn new() -> Self {
        Self {
            factor: Self::FACTOR.default_float(),
            preserve_pitch: Self::PRESERVE_PITCH.default_bool(),
        }
    }

    /// Duration multiplier (> 1 slower and longer, < 1 faster and shorter)
    pub fn set_factor(&mut self, factor: f32) {
        self.factor = Self::FACTOR.clamp_float(factor);
    }

    pub fn set_preserve_pitch(&mut self, on: bool) {
        self.preserve_pitch = on;
    }

    pub fn output_frames(&self, len: usize) -> usize {
        ((len as f64 * self.factor as f64) as usize).max(MIN_OUTPUT)
    }
}

impl Default for TimeStretch {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for TimeStretch {
    fn name(&self) -> &'static str {
        "time_stretch"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::FACTOR) {
            self.set_factor(v);
        }
        if let Some(v) = params.bool(&Self::PRESERVE_PITCH) {
            self.set_preserve_pitch(v);
        }
    }

    fn length_altering(&self) -> bool {
        true
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let new_len = self.output_frames(input.frames());
        let mut output = super::map_channels(input, |ch| {
            if self.preserve_pitch {
                stretch_to_length(ch, new_len)
            } else {
                fft_resample(ch, new_len)
            }
        });
        micro_fade_buffer(&mut output, 64);
        output
    }
}
