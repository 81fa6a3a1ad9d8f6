//! Slice shuffle: cut the segment into equal slices and play them in random order

use super::{seeded_rng, Effect};
use crate::buffer::{AudioBuffer, Segment};
use crate::dsp::micro_fade_buffer;
use crate::params::{ParamSet, ParamSpec};
use rand::seq::SliceRandom;

const MIN_SLICE: usize = 64;

#[derive(Debug, Clone)]
pub struct Shuffle {
    num_slices: usize,
    seed: i64,
}

impl Shuffle {
    const NUM_SLICES: ParamSpec = ParamSpec::int("num_slices", 2, 64, 8);
    const SEED: ParamSpec = ParamSpec::int("seed", 0, i32::MAX as i64, 0);
    const SCHEMA: &'static [ParamSpec] = &[Self::NUM_SLICES, Self::SEED];

    pub fn new() -> Self {
        Self {
            num_slices: Self::NUM_SLICES.default_int() as usize,
            seed: Self::SEED.default_int(),
        }
    }

    pub fn set_num_slices(&mut self, slices: i64) {
        self.num_slices = Self::NUM_SLICES.clamp_int(slices) as usize;
    }

    pub fn set_seed(&mut self, seed: i64) {
        self.seed = Self::SEED.clamp_int(seed);
    }
}

impl Default for Shuffle {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Shuffle {
    fn name(&self) -> &'static str {
        "shuffle"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.int(&Self::NUM_SLICES) {
            self.set_num_slices(v);
        }
        if let Some(v) = params.int(&Self::SEED) {
            self.set_seed(v);
        }
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let len = input.frames();
        let slice_len = (len / self.num_slices).max(MIN_SLICE);

        let mut slices: Vec<AudioBuffer> = (0..self.num_slices)
            .map(|i| i * slice_len)
            .take_while(|&start| start < len)
            .map(|start| {
                let mut slice = input.slice(Segment::new(start, (start + slice_len).min(len)));
                let fade = (slice.frames() / 4).min(16);
                micro_fade_buffer(&mut slice, fade);
                slice
            })
            .collect();
        slices.shuffle(&mut seeded_rng(self.seed));

        let mut output = AudioBuffer::silence(0, input.channels());
        for slice in &slices {
            output.extend(slice);
        }
        // Slices cover len rounded down to a slice multiple; the rest is silence
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
        check_contract(&Shuffle::new());
    }

    #[test]
    fn test_length_is_preserved() {
        for slices in [2, 7, 64] {
            let mut shuffle = Shuffle::new();
            shuffle.set_num_slices(slices);
            for len in [100, 4097, 30_000] {
                let input = stereo_sine(440.0, len);
                assert_eq!(shuffle.process(&input, SR).frames(), len);
            }
        }
    }

    #[test]
    fn test_slices_are_permuted() {
        // Each slice holds a distinct constant
        let mut samples = Vec::new();
        for i in 0..8 {
            samples.extend(std::iter::repeat(i as f32 / 10.0).take(1000));
        }
        let input = AudioBuffer::from_mono(samples);
        let mut shuffle = Shuffle::new();
        shuffle.set_seed(3);
        let output = shuffle.process(&input, SR);

        let mut centers: Vec<i32> = (0..8)
            .map(|i| (output.samples()[i * 1000 + 500] * 10.0).round() as i32)
            .collect();
        centers.sort_unstable();
        assert_eq!(centers, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let input = AudioBuffer::from_mono(noise(8000, 6));
        let shuffle = Shuffle::new();
        assert_eq!(shuffle.process(&input, SR), shuffle.process(&input, SR));
    }
}
