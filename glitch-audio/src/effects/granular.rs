//! Granular scramble
//!
//! The segment is cut into equal grains (edges faded), the grain order is
//! scrambled with `chaos`-scaled random swaps, and grains may be doubled
//! according to `density`. The result is truncated or zero-padded back to
//! the segment length.

use super::{ms_to_frames, seeded_rng, Effect};
use crate::buffer::{AudioBuffer, Segment};
use crate::dsp::micro_fade_buffer;
use crate::params::{ParamSet, ParamSpec};
use rand::Rng;

/// Smallest grain (frames)
const MIN_GRAIN: usize = 64;

/// Fade at each grain edge (frames)
const GRAIN_FADE: usize = 32;

#[derive(Debug, Clone)]
pub struct Granular {
    grain_ms: f32,
    density: f32,
    chaos: f32,
    seed: i64,
}

impl Granular {
    const GRAIN_MS: ParamSpec = ParamSpec::float("grain_ms", 5.0, 500.0, 50.0);
    const DENSITY: ParamSpec = ParamSpec::float("density", 1.0, 16.0, 4.0);
    const CHAOS: ParamSpec = ParamSpec::float("chaos", 0.0, 1.0, 0.5);
    const SEED: ParamSpec = ParamSpec::int("seed", 0, i32::MAX as i64, 0);
    const SCHEMA: &'static [ParamSpec] = &[Self::GRAIN_MS, Self::DENSITY, Self::CHAOS, Self::SEED];

    pub fn new() -> Self {
        Self {
            grain_ms: Self::GRAIN_MS.default_float(),
            density: Self::DENSITY.default_float(),
            chaos: Self::CHAOS.default_float(),
            seed: Self::SEED.default_int(),
        }
    }

    pub fn set_grain_ms(&mut self, ms: f32) {
        self.grain_ms = Self::GRAIN_MS.clamp_float(ms);
    }

    /// Values above 1 duplicate grains; 2 and up doubles every grain
    pub fn set_density(&mut self, density: f32) {
        self.density = Self::DENSITY.clamp_float(density);
    }

    /// Fraction of the grain count used as the number of random swaps
    pub fn set_chaos(&mut self, chaos: f32) {
        self.chaos = Self::CHAOS.clamp_float(chaos);
    }

    pub fn set_seed(&mut self, seed: i64) {
        self.seed = Self::SEED.clamp_int(seed);
    }
}

impl Default for Granular {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Granular {
    fn name(&self) -> &'static str {
        "granular"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::GRAIN_MS) {
            self.set_grain_ms(v);
        }
        if let Some(v) = params.float(&Self::DENSITY) {
            self.set_density(v);
        }
        if let Some(v) = params.float(&Self::CHAOS) {
            self.set_chaos(v);
        }
        if let Some(v) = params.int(&Self::SEED) {
            self.set_seed(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let len = input.frames();
        let grain_len = ms_to_frames(self.grain_ms, sample_rate).max(MIN_GRAIN);
        let n_grains = (len / grain_len).max(1);

        let grains: Vec<AudioBuffer> = (0..n_grains)
            .map(|i| {
                let start = i * grain_len;
                let mut grain = input.slice(Segment::new(start, (start + grain_len).min(len)));
                micro_fade_buffer(&mut grain, GRAIN_FADE);
                grain
            })
            .collect();

        let mut rng = seeded_rng(self.seed);
        let mut order: Vec<usize> = (0..n_grains).collect();
        let swaps = (n_grains as f32 * self.chaos) as usize;
        for _ in 0..swaps {
            let i = rng.gen_range(0..n_grains);
            let j = rng.gen_range(0..n_grains);
            order.swap(i, j);
        }

        let mut output = AudioBuffer::silence(0, input.channels());
        for &idx in &order {
            output.extend(&grains[idx]);
            if self.density > 1.0 && rng.gen::<f32>() < self.density - 1.0 {
                output.extend(&grains[idx]);
            }
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
        check_contract(&Granular::new());
    }

    #[test]
    fn test_length_is_preserved() {
        for grain_ms in [5.0, 50.0, 500.0] {
            for density in [1.0, 1.5, 16.0] {
                let mut granular = Granular::new();
                granular.set_grain_ms(grain_ms);
                granular.set_density(density);
                let input = stereo_sine(440.0, 10_000);
                assert_eq!(granular.process(&input, SR).frames(), 10_000);
            }
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let input = AudioBuffer::from_mono(noise(20_000, 4));
        let mut a = Granular::new();
        a.set_seed(9);
        let mut b = Granular::new();
        b.configure(&ParamSet::new().with("seed", 9));
        assert_eq!(a.process(&input, SR), b.process(&input, SR));

        b.set_seed(10);
        assert_ne!(a.process(&input, SR), b.process(&input, SR));
    }

    #[test]
    fn test_no_chaos_no_density_only_fades() {
        let mut granular = Granular::new();
        granular.set_chaos(0.0);
        granular.set_density(1.0);
        granular.set_grain_ms(10.0);
        let input = AudioBuffer::from_mono(vec![0.5; 4410]);
        let output = granular.process(&input, SR);
        // Grain centers are untouched, grain edges are faded
        assert_eq!(output.samples()[220], 0.5);
        assert_eq!(output.samples()[441], 0.0);
    }

    #[test]
    fn test_short_segment_is_one_grain() {
        let input = AudioBuffer::from_mono(vec![0.5; 40]);
        let output = Granular::new().process(&input, SR);
        assert_eq!(output.frames(), 40);
    }
}
