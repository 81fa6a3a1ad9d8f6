//! Basic edits: reverse, volume, pan

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::{fade_in, fade_out};
use crate::params::{ParamSet, ParamSpec};
use std::f32::consts::FRAC_PI_4;

/// Play the segment backwards, with short fades at both splice points
#[derive(Debug, Clone, Default)]
pub struct Reverse;

impl Reverse {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for Reverse {
    fn name(&self) -> &'static str {
        "reverse"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn configure(&mut self, _params: &ParamSet) {}

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let fade = (input.frames() / 4).min(64);
        super::map_channels(input, |ch| {
            let mut reversed: Vec<f32> = ch.iter().rev().copied().collect();
            fade_in(&mut reversed, fade);
            fade_out(&mut reversed, fade);
            reversed
        })
    }
}

/// Gain change in percent (100 = unchanged)
#[derive(Debug, Clone)]
pub struct Volume {
    gain_pct: f32,
}

impl Volume {
    const GAIN_PCT: ParamSpec = ParamSpec::float("gain_pct", 0.0, 1000.0, 100.0);
    const SCHEMA: &'static [ParamSpec] = &[Self::GAIN_PCT];

    pub fn new() -> Self {
        Self {
            gain_pct: Self::GAIN_PCT.default_float(),
        }
    }

    pub fn with_gain_pct(gain_pct: f32) -> Self {
        let mut volume = Self::new();
        volume.set_gain_pct(gain_pct);
        volume
    }

    /// Set gain in percent (0 - 1000)
    pub fn set_gain_pct(&mut self, gain_pct: f32) {
        self.gain_pct = Self::GAIN_PCT.clamp_float(gain_pct);
    }

    pub fn gain_pct(&self) -> f32 {
        self.gain_pct
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Volume {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::GAIN_PCT) {
            self.set_gain_pct(v);
        }
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let gain = self.gain_pct / 100.0;
        let mut output = input.clone();
        output.samples_mut().iter_mut().for_each(|s| *s *= gain);
        output
    }
}

/// Constant-power stereo pan with optional mono collapse
///
/// Always produces stereo; a mono segment is duplicated first.
#[derive(Debug, Clone)]
pub struct Pan {
    pan: f32,
    mono: bool,
}

impl Pan {
    const PAN: ParamSpec = ParamSpec::float("pan", -1.0, 1.0, 0.0);
    const MONO: ParamSpec = ParamSpec::bool("mono", false);
    const SCHEMA: &'static [ParamSpec] = &[Self::PAN, Self::MONO];

    pub fn new() -> Self {
        Self {
            pan: Self::PAN.default_float(),
            mono: Self::MONO.default_bool(),
        }
    }

    /// Set position (-1 = hard left, 0 = center, 1 = hard right)
    pub fn set_pan(&mut self, pan: f32) {
        self.pan = Self::PAN.clamp_float(pan);
    }

    pub fn set_mono(&mut self, mono: bool) {
        self.mono = mono;
    }
}

impl Default for Pan {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Pan {
    fn name(&self) -> &'static str {
        "pan"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::PAN) {
            self.set_pan(v);
        }
        if let Some(v) = params.bool(&Self::MONO) {
            self.set_mono(v);
        }
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let (mut left, mut right) = if self.mono || !input.is_stereo() {
            let mono = input.to_mono();
            (mono.clone(), mono)
        } else {
            (input.channel(0), input.channel(1))
        };

        let angle = (self.pan + 1.0) * FRAC_PI_4;
        let (gain_r, gain_l) = angle.sin_cos();
        left.iter_mut().for_each(|s| *s *= gain_l);
        right.iter_mut().for_each(|s| *s *= gain_r);

        AudioBuffer::from_planar(&[left, right])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::buffer::Segment;

    #[test]
    fn test_contract() {
        check_contract(&Reverse::new());
        check_contract(&Volume::with_gain_pct(400.0));
        check_contract(&Pan::new());
    }

    #[test]
    fn test_reverse_flips_interior() {
        let input = AudioBuffer::from_mono((0..1000).map(|i| i as f32 / 1000.0).collect());
        let output = Reverse::new().process(&input, SR);
        assert_eq!(output.samples()[500], input.samples()[499]);
        assert_eq!(output.samples()[0], 0.0);
        assert_eq!(output.samples()[999], 0.0);
    }

    #[test]
    fn test_volume_clamps_and_scales() {
        let mut volume = Volume::new();
        volume.configure(&ParamSet::new().with("gain_pct", 5000.0));
        assert_eq!(volume.gain_pct(), 1000.0);

        let input = mono_sine(440.0, 1000);
        let output = Volume::with_gain_pct(0.0).apply(&input, Segment::whole(&input), SR);
        assert!(output.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_pan_hard_left() {
        let input = mono_sine(440.0, 1000);
        let mut pan = Pan::new();
        pan.set_pan(-1.0);
        let output = pan.apply(&input, Segment::whole(&input), SR);
        assert!(output.is_stereo());
        assert!(rms(&output.channel(1)) < 1e-6);
        assert!((rms(&output.channel(0)) - rms(input.samples())).abs() < 1e-4);
    }

    #[test]
    fn test_pan_center_is_constant_power() {
        let input = stereo_sine(440.0, 1000);
        let output = Pan::new().process(&input, SR);
        let expected = rms(&input.channel(0)) * FRAC_PI_4.cos();
        assert!((rms(&output.channel(0)) - expected).abs() < 1e-4);
        assert!((rms(&output.channel(1)) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_pan_mono_collapse() {
        let input = AudioBuffer::from_planar(&[vec![1.0; 100], vec![0.0; 100]]);
        let mut pan = Pan::new();
        pan.set_mono(true);
        let output = pan.process(&input, SR);
        assert_eq!(output.channel(0), output.channel(1));
    }
}
