//! Buffer freeze: loop the opening of the segment over its whole length

use super::{ms_to_frames, Effect};
use crate::buffer::{AudioBuffer, Segment};
use crate::dsp::micro_fade_buffer;
use crate::params::{ParamSet, ParamSpec};

#[derive(Debug, Clone)]
pub struct BufferFreeze {
    buffer_ms: f32,
}

impl BufferFreeze {
    const BUFFER_MS: ParamSpec = ParamSpec::float("buffer_ms", 10.0, 500.0, 50.0);
    const SCHEMA: &'static [ParamSpec] = &[Self::BUFFER_MS];

    pub fn new() -> Self {
        Self {
            buffer_ms: Self::BUFFER_MS.default_float(),
        }
    }

    /// Length of the frozen loop in milliseconds
    pub fn set_buffer_ms(&mut self, ms: f32) {
        self.buffer_ms = Self::BUFFER_MS.clamp_float(ms);
    }
}

impl Default for BufferFreeze {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for BufferFreeze {
    fn name(&self) -> &'static str {
        "buffer_freeze"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::BUFFER_MS) {
            self.set_buffer_ms(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let len = input.frames();
        let grain_len = ms_to_frames(self.buffer_ms, sample_rate)
            .min(len)
            .max(64);
        let mut grain = input.slice(Segment::new(0, grain_len));
        let fade = (grain.frames() / 4).min(32);
        micro_fade_buffer(&mut grain, fade);

        let mut output = AudioBuffer::silence(0, input.channels());
        while output.frames() < len && !grain.is_empty() {
            output.extend(&grain);
        }
        output.fit_frames(len);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&BufferFreeze::new());
    }

    #[test]
    fn test_loop_repeats_opening() {
        let mut freeze = BufferFreeze::new();
        freeze.set_buffer_ms(10.0);
        let input = AudioBuffer::from_mono(noise(10_000, 5));
        let output = freeze.process(&input, SR);
        assert_eq!(output.frames(), 10_000);
        // 441-frame loop
        assert_eq!(output.samples()[100], input.samples()[100]);
        assert_eq!(output.samples()[441 + 100], input.samples()[100]);
        assert_eq!(output.samples()[441 * 20 + 200], input.samples()[200]);
    }

    #[test]
    fn test_grain_longer_than_segment() {
        let mut freeze = BufferFreeze::new();
        freeze.set_buffer_ms(500.0);
        let input = stereo_sine(440.0, 1000);
        let output = freeze.process(&input, SR);
        assert_eq!(output.frames(), 1000);
        assert_eq!(output.samples()[1000], input.samples()[1000]);
    }
}
