//! Hyper - one-knob hyperpop chain
//!
//! Runs, in order: peak compression, `tanh` drive, an octave-and-fifth
//! shimmer layer, first-difference brightness, a partial bit-crush, mid/side
//! widening and a final soft limiter.

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::{micro_fade, pitch_shift};
use crate::params::{ParamSet, ParamSpec};

#[derive(Debug, Clone)]
pub struct Hyper {
    intensity: f32,
    shimmer: f32,
    brightness: f32,
    crush: f32,
    width: f32,
}

impl Hyper {
    const INTENSITY: ParamSpec = ParamSpec::float("intensity", 0.0, 1.0, 0.5);
    const SHIMMER: ParamSpec = ParamSpec::float("shimmer", 0.0, 1.0, 0.3);
    const BRIGHTNESS: ParamSpec = ParamSpec::float("brightness", 0.0, 1.0, 0.5);
    const CRUSH: ParamSpec = ParamSpec::float("crush", 0.0, 1.0, 0.0);
    const WIDTH: ParamSpec = ParamSpec::float("width", 0.0, 1.0, 0.5);
    const SCHEMA: &'static [ParamSpec] = &[
        Self::INTENSITY,
        Self::SHIMMER,
        Self::BRIGHTNESS,
        Self::CRUSH,
        Self::WIDTH,
    ];

    pub fn new() -> Self {
        Self {
            intensity: Self::INTENSITY.default_float(),
            shimmer: Self::SHIMMER.default_float(),
            brightness: Self::BRIGHTNESS.default_float(),
            crush: Self::CRUSH.default_float(),
            width: Self::WIDTH.default_float(),
        }
    }

    /// Compression and drive amount
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = Self::INTENSITY.clamp_float(intensity);
    }

    /// Level of the pitched-up layer
    pub fn set_shimmer(&mut self, shimmer: f32) {
        self.shimmer = Self::SHIMMER.clamp_float(shimmer);
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = Self::BRIGHTNESS.clamp_float(brightness);
    }

    pub fn set_crush(&mut self, crush: f32) {
        self.crush = Self::CRUSH.clamp_float(crush);
    }

    /// Side-signal boost, stereo input only
    pub fn set_width(&mut self, width: f32) {
        self.width = Self::WIDTH.clamp_float(width);
    }

    fn compress(&self, x: f32) -> f32 {
        let threshold = 1.0 - self.intensity * 0.6;
        let ratio = 1.0 + self.intensity * 7.0;
        let level = x.abs();
        if level > threshold {
            x.signum() * (threshold + (level - threshold) / ratio)
        } else {
            x
        }
    }

    /// Compression then drive for one channel
    fn color(&self, ch: &[f32]) -> Vec<f32> {
        let drive = 1.0 + self.intensity * 4.0;
        ch.iter()
            .map(|&x| {
                let x = self.compress(x);
                if self.intensity > 0.1 {
                    (x * drive).tanh() / drive.tanh()
                } else {
                    x
                }
            })
            .collect()
    }

    fn brighten(&self, ch: &mut [f32]) {
        if self.brightness <= 0.01 || ch.is_empty() {
            return;
        }
        let amount = self.brightness * 0.3;
        let mut prev = ch[0];
        for sample in ch.iter_mut() {
            let current = *sample;
            *sample += (current - prev) * amount;
            prev = current;
        }
    }

    fn crush_channel(&self, ch: &mut [f32]) {
        if self.crush <= 0.05 {
            return;
        }
        let levels = ((512.0 * (1.0 - self.crush * 0.85)) as i32).max(8) as f32;
        for sample in ch.iter_mut() {
            let crushed = (*sample * levels).round() / levels;
            *sample = *sample * (1.0 - self.crush) + crushed * self.crush;
        }
    }
}

impl Default for Hyper {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Hyper {
    fn name(&self) -> &'static str {
        "hyper"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::INTENSITY) {
            self.set_intensity(v);
        }
        if let Some(v) = params.float(&Self::SHIMMER) {
            self.set_shimmer(v);
        }
        if let Some(v) = params.float(&Self::BRIGHTNESS) {
            self.set_brightness(v);
        }
        if let Some(v) = params.float(&Self::CRUSH) {
            self.set_crush(v);
        }
        if let Some(v) = params.float(&Self::WIDTH) {
            self.set_width(v);
        }
    }

    fn min_frames(&self) -> usize {
        64
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let mut planes: Vec<Vec<f32>> = input.to_planar().iter().map(|ch| self.color(ch)).collect();

        if self.shimmer > 0.01 {
            let mono = AudioBuffer::from_planar(&planes).to_mono();
            let octave = pitch_shift(&mono, 12.0);
            let fifth = pitch_shift(&mono, 7.0);
            let level = self.shimmer * 0.4;
            for plane in planes.iter_mut() {
                for ((s, o), f) in plane.iter_mut().zip(&octave).zip(&fifth) {
                    *s += (0.6 * o + 0.4 * f) * level;
                }
            }
        }

        for plane in planes.iter_mut() {
            self.brighten(plane);
            self.crush_channel(plane);
        }

        if planes.len() == 2 && self.width > 0.01 {
            let spread = 1.0 + self.width * 2.0;
            let (left, right) = planes.split_at_mut(1);
            for (l, r) in left[0].iter_mut().zip(right[0].iter_mut()) {
                let mid = (*l + *r) * 0.5;
                let side = (*l - *r) * 0.5 * spread;
                *l = mid + side;
                *r = mid - side;
            }
        }

        for plane in planes.iter_mut() {
            plane.iter_mut().for_each(|s| *s = (*s * 0.95).tanh());
            micro_fade(plane, 64);
        }
        AudioBuffer::from_planar(&planes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&Hyper::new());
        let mut max = Hyper::new();
        max.configure(
            &ParamSet::new()
                .with("intensity", 1.0)
                .with("shimmer", 1.0)
                .with("brightness", 1.0)
                .with("crush", 1.0)
                .with("width", 1.0),
        );
        check_contract(&max);
    }

    #[test]
    fn test_compressor_curve() {
        let mut hyper = Hyper::new();
        hyper.set_intensity(1.0);
        // Threshold 0.4, ratio 8
        assert!((hyper.compress(0.8) - 0.45).abs() < 1e-6);
        assert!((hyper.compress(-0.8) + 0.45).abs() < 1e-6);
        assert_eq!(hyper.compress(0.3), 0.3);
    }

    #[test]
    fn test_bypassed_stages_leave_only_limiter() {
        let mut hyper = Hyper::new();
        hyper.configure(
            &ParamSet::new()
                .with("intensity", 0.0)
                .with("shimmer", 0.0)
                .with("brightness", 0.0)
                .with("width", 0.0),
        );
        let input = mono_sine(220.0, 4096);
        let output = hyper.process(&input, SR);
        for i in [500, 1000, 3000] {
            let expected = (input.samples()[i] * 0.95).tanh();
            assert!((output.samples()[i] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_width_only_touches_side() {
        let mut narrow = Hyper::new();
        narrow.set_shimmer(0.0);
        narrow.set_width(0.0);
        let mut wide = narrow.clone();
        wide.set_width(1.0);

        let input = AudioBuffer::from_planar(&[sine(300.0, 4096, 0.05), sine(500.0, 4096, 0.05)]);
        let a = narrow.process(&input, SR);
        let b = wide.process(&input, SR);
        let side = |buf: &AudioBuffer| {
            let d: Vec<f32> = buf
                .channel(0)
                .iter()
                .zip(buf.channel(1))
                .map(|(l, r)| l - r)
                .collect();
            rms(&d)
        };
        assert!(side(&b) > side(&a) * 1.5);

        let mono = stereo_sine(300.0, 4096);
        assert_eq!(wide.process(&mono, SR).channel(0), wide.process(&mono, SR).channel(1));
    }
}
