//! Tremolo - amplitude modulation by a low-frequency oscillator

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::params::{ParamSet, ParamSpec};
use std::f64::consts::PI;

/// LFO waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum LfoShape {
    #[default]
    Sine,
    Square,
    Triangle,
    Saw,
}

impl LfoShape {
    pub const NAMES: &'static [&'static str] = &["sine", "square", "triangle", "saw"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "square" => LfoShape::Square,
            "triangle" => LfoShape::Triangle,
            "saw" => LfoShape::Saw,
            _ => LfoShape::Sine,
        }
    }

    /// Unipolar LFO value in `[0, 1]` at `cycles` (rate times time)
    #[inline]
    fn value(self, cycles: f64) -> f64 {
        match self {
            LfoShape::Sine => 0.5 * (1.0 + (2.0 * PI * cycles).sin()),
            LfoShape::Square => {
                if (2.0 * PI * cycles).sin() >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            LfoShape::Triangle => 2.0 * (cycles - (cycles + 0.5).floor()).abs(),
            LfoShape::Saw => cycles.rem_euclid(1.0),
        }
    }
}

/// Tremolo with selectable LFO shape
#[derive(Debug, Clone)]
pub struct Tremolo {
    rate_hz: f32,
    depth: f32,
    shape: LfoShape,
}

impl Tremolo {
    const RATE_HZ: ParamSpec = ParamSpec::float("rate_hz", 0.1, 30.0, 5.0);
    const DEPTH: ParamSpec = ParamSpec::float("depth", 0.0, 1.0, 0.7);
    const SHAPE: ParamSpec = ParamSpec::choice("shape", LfoShape::NAMES, "sine");
    const SCHEMA: &'static [ParamSpec] = &[Self::RATE_HZ, Self::DEPTH, Self::SHAPE];

    pub fn new() -> Self {
        Self {
            rate_hz: Self::RATE_HZ.default_float(),
            depth: Self::DEPTH.default_float(),
            shape: LfoShape::default(),
        }
    }

    pub fn set_rate_hz(&mut self, rate: f32) {
        self.rate_hz = Self::RATE_HZ.clamp_float(rate);
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = Self::DEPTH.clamp_float(depth);
    }

    pub fn set_shape(&mut self, shape: LfoShape) {
        self.shape = shape;
    }
}

impl Default for Tremolo {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Tremolo {
    fn name(&self) -> &'static str {
        "tremolo"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::RATE_HZ) {
            self.set_rate_hz(v);
        }
        if let Some(v) = params.float(&Self::DEPTH) {
            self.set_depth(v);
        }
        if let Some(v) = params.choice(&Self::SHAPE) {
            self.set_shape(LfoShape::from_name(v));
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let rate = self.rate_hz as f64 / sample_rate.max(1) as f64;
        let depth = self.depth as f64;
        let envelope: Vec<f32> = (0..input.frames())
            .map(|i| (1.0 - depth * (1.0 - self.shape.value(rate * i as f64))) as f32)
            .collect();

        let channels = input.channels();
        let mut output = input.clone();
        for (i, sample) in output.samples_mut().iter_mut().enumerate() {
            *sample *= envelope[i / channels];
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
        check_contract(&Tremolo::new());
    }

    #[test]
    fn test_lfo_shapes_are_unipolar() {
        for shape in [LfoShape::Sine, LfoShape::Square, LfoShape::Triangle, LfoShape::Saw] {
            for i in 0..100 {
                let v = shape.value(i as f64 * 0.037);
                assert!((0.0..=1.0).contains(&v), "{:?} {}", shape, v);
            }
        }
        assert_eq!(LfoShape::Triangle.value(0.0), 0.0);
        assert_eq!(LfoShape::Triangle.value(0.5), 1.0);
        assert_eq!(LfoShape::Saw.value(1.25), 0.25);
    }

    #[test]
    fn test_full_depth_square_gates() {
        let mut tremolo = Tremolo::new();
        tremolo.set_depth(1.0);
        tremolo.set_rate_hz(10.0);
        tremolo.configure(&ParamSet::new().with("shape", "square"));
        let output = tremolo.process(&AudioBuffer::from_mono(vec![0.5; 4410]), SR);
        // First half-cycle open, second closed
        assert_eq!(output.samples()[100], 0.5);
        assert_eq!(output.samples()[3000], 0.0);
    }

    #[test]
    fn test_zero_depth_is_identity() {
        let mut tremolo = Tremolo::new();
        tremolo.set_depth(0.0);
        let input = stereo_sine(200.0, 1000);
        assert_eq!(tremolo.process(&input, SR), input);
    }
}
