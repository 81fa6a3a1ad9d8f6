//! Vinyl: crackle pops, surface hiss and a slow speed wobble

use super::{seeded_rng, Effect};
use crate::buffer::AudioBuffer;
use crate::dsp::{warp_read, FilterKind, SosFilter};
use crate::params::{ParamSet, ParamSpec};
use rand::Rng;
use std::f64::consts::PI;

/// Pops per frame at full crackle
const POP_DENSITY: f32 = 0.001;

/// Wobble rate of the platter (Hz)
const WOW_HZ: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct Vinyl {
    crackle: f32,
    noise: f32,
    wow: f32,
    seed: i64,
}

impl Vinyl {
    const CRACKLE: ParamSpec = ParamSpec::float("crackle", 0.0, 1.0, 0.3);
    const NOISE: ParamSpec = ParamSpec::float("noise", 0.0, 1.0, 0.2);
    const WOW: ParamSpec = ParamSpec::float("wow", 0.0, 1.0, 0.3);
    const SEED: ParamSpec = ParamSpec::int("seed", 0, i32::MAX as i64, 0);
    const SCHEMA: &'static [ParamSpec] = &[Self::CRACKLE, Self::NOISE, Self::WOW, Self::SEED];

    pub fn new() -> Self {
        Self {
            crackle: Self::CRACKLE.default_float(),
            noise: Self::NOISE.default_float(),
            wow: Self::WOW.default_float(),
            seed: Self::SEED.default_int(),
        }
    }

    pub fn set_crackle(&mut self, crackle: f32) {
        self.crackle = Self::CRACKLE.clamp_float(crackle);
    }

    pub fn set_noise(&mut self, noise: f32) {
        self.noise = Self::NOISE.clamp_float(noise);
    }

    pub fn set_wow(&mut self, wow: f32) {
        self.wow = Self::WOW.clamp_float(wow);
    }

    pub fn set_seed(&mut self, seed: i64) {
        self.seed = Self::SEED.clamp_int(seed);
    }

    /// Crackle plus hiss, shared by every channel
    fn surface(&self, n: usize, sample_rate: u32) -> Vec<f32> {
        let mut rng = seeded_rng(self.seed);
        let mut surface = vec![0.0f32; n];

        if self.crackle > 0.0 && n > 0 {
            let mut pops = vec![0.0f32; n];
            let count = (n as f32 * self.crackle * POP_DENSITY) as usize;
            for _ in 0..count {
                let pos = rng.gen_range(0..n);
                let amp = rng.gen_range(0.02..0.15);
                let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
                pops[pos] = amp * sign * self.crackle;
            }
            let clicks = SosFilter::butterworth(FilterKind::Highpass, 2, 1000.0, sample_rate);
            for (s, p) in surface.iter_mut().zip(clicks.process(&pops)) {
                *s += p;
            }
        }

        if self.noise > 0.0 {
            let level = self.noise * 0.035;
            let white: Vec<f32> = (0..n).map(|_| rng.gen_range(-level..level)).collect();
            let hiss = SosFilter::butterworth(FilterKind::Highpass, 2, 3000.0, sample_rate);
            for (s, h) in surface.iter_mut().zip(hiss.process(&white)) {
                *s += h;
            }
        }

        surface
    }

    fn speed_curve(&self, n: usize, sample_rate: u32) -> Vec<f64> {
        let sr = sample_rate.max(1) as f64;
        let depth = self.wow as f64 * 0.005;
        (0..n)
            .map(|i| 1.0 + depth * (2.0 * PI * WOW_HZ * i as f64 / sr).sin())
            .collect()
    }
}

impl Default for Vinyl {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Vinyl {
    fn name(&self) -> &'static str {
        "vinyl"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::CRACKLE) {
            self.set_crackle(v);
        }
        if let Some(v) = params.float(&Self::NOISE) {
            self.set_noise(v);
        }
        if let Some(v) = params.float(&Self::WOW) {
            self.set_wow(v);
        }
        if let Some(v) = params.int(&Self::SEED) {
            self.set_seed(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let n = input.frames();
        let surface = self.surface(n, sample_rate);
        let speed = (self.wow > 0.0).then(|| self.speed_curve(n, sample_rate));

        super::map_channels(input, |ch| {
            let dirty: Vec<f32> = ch.iter().zip(surface.iter()).map(|(x, s)| x + s).collect();
            match &speed {
                Some(speed) => warp_read(&dirty, speed),
                None => dirty,
            }
        })
    }
}
