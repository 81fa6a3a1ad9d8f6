//! Datamosh: swap random equal-size blocks inside the segment
//!
//! Every seam touching a moved block gets a short fade on both sides.

use super::{seeded_rng, Effect};
use crate::buffer::AudioBuffer;
use crate::dsp::fade_frames;
use crate::params::{ParamSet, ParamSpec};
use rand::Rng;

/// Fade length at block seams (frames)
const SEAM_FADE: usize = 32;

#[derive(Debug, Clone)]
pub struct Datamosh {
    block_size: usize,
    chaos: f32,
    seed: i64,
}

impl Datamosh {
    const BLOCK_SIZE: ParamSpec = ParamSpec::int("block_size", 64, 8192, 512);
    const CHAOS: ParamSpec = ParamSpec::float("chaos", 0.0, 1.0, 0.5);
    const SEED: ParamSpec = ParamSpec::int("seed", 0, i32::MAX as i64, 0);
    const SCHEMA: &'static [ParamSpec] = &[Self::BLOCK_SIZE, Self::CHAOS, Self::SEED];

    pub fn new() -> Self {
        Self {
            block_size: Self::BLOCK_SIZE.default_int() as usize,
            chaos: Self::CHAOS.default_float(),
            seed: Self::SEED.default_int(),
        }
    }

    /// Block size in frames
    pub fn set_block_size(&mut self, frames: i64) {
        self.block_size = Self::BLOCK_SIZE.clamp_int(frames) as usize;
    }

    /// Fraction of the block count used as the number of swaps (at least one)
    pub fn set_chaos(&mut self, chaos: f32) {
        self.chaos = Self::CHAOS.clamp_float(chaos);
    }

    pub fn set_seed(&mut self, seed: i64) {
        self.seed = Self::SEED.clamp_int(seed);
    }
}

impl Default for Datamosh {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Datamosh {
    fn name(&self) -> &'static str {
        "datamosh"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.int(&Self::BLOCK_SIZE) {
            self.set_block_size(v);
        }
        if let Some(v) = params.float(&Self::CHAOS) {
            self.set_chaos(v);
        }
        if let Some(v) = params.int(&Self::SEED) {
            self.set_seed(v);
        }
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let len = input.frames();
        let channels = input.channels();
        let n_blocks = (len / self.block_size).max(1);
        let swaps = ((n_blocks as f32 * self.chaos) as usize).max(1);

        let mut output = input.clone();
        let mut moved = vec![false; n_blocks];
        let samples = output.samples_mut();
        let mut rng = seeded_rng(self.seed);
        for _ in 0..swaps {
            let i = rng.gen_range(0..n_blocks);
            let j = rng.gen_range(0..n_blocks);
            if i == j {
                continue;
            }
            let (s1, s2) = (i * self.block_size, j * self.block_size);
            let block = self
                .block_size
                .min(len.saturating_sub(s1))
                .min(len.saturating_sub(s2));
            let (lo, hi) = (s1.min(s2) * channels, s1.max(s2) * channels);
            let width = block * channels;
            // Blocks never overlap since `hi - lo` is a whole block multiple
            let (head, tail) = samples.split_at_mut(hi);
            head[lo..lo + width].swap_with_slice(&mut tail[..width]);
            moved[i] = true;
            moved[j] = true;
        }

        let fade = (self.block_size / 4).min(SEAM_FADE);
        for b in 0..n_blocks {
            if !moved[b] {
                continue;
            }
            let start = b * self.block_size;
            let end = (start + self.block_size).min(len);
            fade_frames(&mut output, start, fade, true);
            fade_frames(&mut output, end.saturating_sub(fade), fade, false);
            // The untouched neighbours meet this block at silence too
            if b > 0 && !moved[b - 1] {
                fade_frames(&mut output, start.saturating_sub(fade), fade, false);
            }
            if end < len && moved.get(b + 1) != Some(&true) {
                fade_frames(&mut output, end, fade, true);
            }
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
        check_contract(&Datamosh::new());
    }

    #[test]
    fn test_blocks_move_intact() {
        let mut samples = Vec::new();
        for i in 0..16 {
            samples.extend(std::iter::repeat(i as f32 / 20.0).take(256));
        }
        let input = AudioBuffer::from_mono(samples);
        let mut mosh = Datamosh::new();
        mosh.set_block_size(256);
        mosh.set_chaos(1.0);
        mosh.set_seed(11);
        let output = mosh.process(&input, SR);

        assert_eq!(output.frames(), input.frames());
        // Interiors stay constant; only the faded seams differ
        let mut levels = Vec::new();
        for block in output.samples().chunks(256) {
            let interior = &block[32..224];
            assert!(interior.iter().all(|&s| s == interior[0]));
            levels.push(interior[0]);
        }
        levels.sort_by(f32::total_cmp);
        let expected: Vec<f32> = (0..16).map(|i| i as f32 / 20.0).collect();
        assert_eq!(levels, expected);
        assert_ne!(output, input);
    }

    #[test]
    fn test_seams_do_not_click() {
        let len = 8192;
        let ramp: Vec<f32> = (0..len).map(|i| i as f32 / len as f32).collect();
        let input = AudioBuffer::from_mono(ramp);
        let mut mosh = Datamosh::new();
        mosh.set_block_size(512);
        mosh.set_chaos(1.0);
        mosh.set_seed(3);
        let output = mosh.process(&input, SR);
        assert_ne!(output, input);
        let max_jump = output
            .samples()
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max);
        assert!(max_jump < 0.05, "max jump {}", max_jump);
    }

    #[test]
    fn test_segment_shorter_than_block() {
        let input = AudioBuffer::from_mono(noise(100, 1));
        let mut mosh = Datamosh::new();
        mosh.set_block_size(512);
        assert_eq!(mosh.process(&input, SR), input);
    }
}
