//! Tape stop: the end of the segment slows to a halt
//!
//! The last `duration_ms` of the segment (at least 256 frames, at most the
//! whole segment) is cut into 64 chunks. Chunk `i` is stretched by the
//! inverse of a speed falling from 1 to 0.05 and faded from 1 to 0.2, so the
//! tail both drops in pitch and grows longer. Length-altering.

use super::{ms_to_frames, Effect};
use crate::buffer::{AudioBuffer, Segment};
use crate::dsp::fft_resample;
use crate::params::{ParamSet, ParamSpec};

const CHUNKS: usize = 64;
const MIN_EFFECT_FRAMES: usize = 256;
const MIN_SPEED: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct TapeStop {
    duration_ms: f32,
}

impl TapeStop {
    const DURATION_MS: ParamSpec = ParamSpec::float("duration_ms", 100.0, 5000.0, 1500.0);
    const SCHEMA: &'static [ParamSpec] = &[Self::DURATION_MS];

    pub fn new() -> Self {
        Self {
            duration_ms: Self::DURATION_MS.default_float(),
        }
    }

    /// Length of the slowdown in milliseconds of source audio
    pub fn set_duration_ms(&mut self, ms: f32) {
        self.duration_ms = Self::DURATION_MS.clamp_float(ms);
    }

    /// Frames of the segment that take part in the slowdown
    fn effect_frames(&self, len: usize, sample_rate: u32) -> usize {
        let wanted = ms_to_frames(self.duration_ms, sample_rate);
        let min_share = (len as f32 * 0.05) as usize;
        wanted.max(min_share).max(MIN_EFFECT_FRAMES).min(len)
    }

    #[inline]
    fn speed(i: usize) -> f32 {
        (1.0 - (i as f32 / CHUNKS as f32) * 0.95).max(MIN_SPEED)
    }

    #[inline]
    fn gain(i: usize) -> f32 {
        (1.0 - (i as f32 / CHUNKS as f32) * 0.8).max(0.0)
    }
}

impl Default for TapeStop {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for TapeStop {
    fn name(&self) -> &'static str {
        "tape_stop"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::DURATION_MS) {
            self.set_duration_ms(v);
        }
    }

    fn length_altering(&self) -> bool {
        true
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let len = input.frames();
        let clean_len = len - self.effect_frames(len, sample_rate);
        let tail = input.slice(Segment::new(clean_len, len));
        let tail_len = tail.frames();
        let chunk = (tail_len / CHUNKS).max(1);

        let mut output = input.slice(Segment::new(0, clean_len));
        for i in 0..CHUNKS {
            let start = i * chunk;
            if start >= tail_len {
                break;
            }
            // The last chunk takes the division remainder
            let end = if i == CHUNKS - 1 {
                tail_len
            } else {
                (start + chunk).min(tail_len)
            };
            let part = tail.slice(Segment::new(start, end));
            let new_len = ((part.frames() as f32 / Self::speed(i)) as usize).max(4);
            let gain = Self::gain(i);
            let slowed = super::map_channels(&part, |ch| {
                fft_resample(ch, new_len).into_iter().map(|s| s * gain).collect()
            });
            output.extend(&slowed);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&TapeStop::new());
        let mut short = TapeStop::new();
        short.set_duration_ms(100.0);
        check_contract(&short);
    }

    #[test]
    fn test_ramps() {
        assert_eq!(TapeStop::speed(0), 1.0);
        assert!((TapeStop::speed(63) - (1.0 - 63.0 / 64.0 * 0.95)).abs() < 1e-6);
        assert!(TapeStop::speed(63) >= MIN_SPEED);
        assert_eq!(TapeStop::gain(0), 1.0);
        assert!(TapeStop::gain(63) > 0.2);
    }

    #[test]
    fn test_clean_head_and_longer_tail() {
        let input = mono_sine(440.0, 88_200);
        let mut stop = TapeStop::new();
        stop.set_duration_ms(1000.0);
        let output = stop.process(&input, SR);
        // First second untouched
        assert_eq!(output.samples()[..44_100], input.samples()[..44_100]);
        assert!(output.frames() > 88_200 * 3 / 2);
    }

    #[test]
    fn test_tail_gets_quieter() {
        let input = mono_sine(440.0, 44_100);
        let output = TapeStop::new().process(&input, SR);
        let n = output.frames();
        let head = rms(&output.samples()[..n / 10]);
        let tail = rms(&output.samples()[n - n / 10..]);
        assert!(tail < head * 0.5);
    }

    #[test]
    fn test_remainder_is_kept() {
        // 1000 frames: 64 chunks of 15 plus a remainder of 40
        let input = AudioBuffer::from_mono(vec![0.5; 1000]);
        let mut stop = TapeStop::new();
        stop.set_duration_ms(5000.0);
        let output = stop.process(&input, SR);
        let expected: usize = (0..64)
            .map(|i| {
                let frames = if i == 63 { 1000 - 63 * 15 } else { 15 };
                ((frames as f32 / TapeStop::speed(i)) as usize).max(4)
            })
            .sum();
        assert_eq!(output.frames(), expected);
    }
}
