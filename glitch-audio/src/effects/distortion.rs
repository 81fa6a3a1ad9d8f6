//! Waveshaping distortion with a post tone filter

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::one_pole_lowpass;
use crate::params::{ParamSet, ParamSpec};

/// Waveshaping curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DistortionMode {
    /// Exponential saturation
    #[default]
    Tube,
    /// Hard `tanh` fuzz
    Fuzz,
    /// Amplitude quantization
    Digital,
    /// Power-law expansion of a `tanh` curve
    Scream,
}

impl DistortionMode {
    pub const NAMES: &'static [&'static str] = &["tube", "fuzz", "digital", "scream"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "fuzz" => DistortionMode::Fuzz,
            "digital" => DistortionMode::Digital,
            "scream" => DistortionMode::Scream,
            _ => DistortionMode::Tube,
        }
    }
}

/// Distortion with drive, curve and tone
#[derive(Debug, Clone)]
pub struct Distortion {
    drive: f32,
    tone: f32,
    mode: DistortionMode,
}

impl Distortion {
    const DRIVE: ParamSpec = ParamSpec::float("drive", 1.0, 20.0, 5.0);
    const TONE: ParamSpec = ParamSpec::float("tone", 0.0, 1.0, 0.5);
    const MODE: ParamSpec = ParamSpec::choice("mode", DistortionMode::NAMES, "tube");
    const SCHEMA: &'static [ParamSpec] = &[Self::DRIVE, Self::TONE, Self::MODE];

    /// Tone settings at or above this skip the filter
    const TONE_BYPASS: f32 = 0.95;

    pub fn new() -> Self {
        Self {
            drive: Self::DRIVE.default_float(),
            tone: Self::TONE.default_float(),
            mode: DistortionMode::default(),
        }
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = Self::DRIVE.clamp_float(drive);
    }

    /// Set tone (0 = dark, 1 = bright)
    pub fn set_tone(&mut self, tone: f32) {
        self.tone = Self::TONE.clamp_float(tone);
    }

    pub fn set_mode(&mut self, mode: DistortionMode) {
        self.mode = mode;
    }

    #[inline]
    fn shape(&self, x: f32) -> f32 {
        let x = x * self.drive;
        match self.mode {
            DistortionMode::Tube => x.signum() * (1.0 - (-x.abs()).exp()),
            DistortionMode::Fuzz => (2.0 * x).tanh() * (x + 0.001).signum(),
            DistortionMode::Digital => {
                let steps = ((16.0 / self.drive) as i32).max(2) as f32;
                (x.clamp(-1.0, 1.0) * steps).round() / steps
            }
            DistortionMode::Scream => {
                let y = (3.0 * x).tanh();
                y.signum() * y.abs().powf(0.3)
            }
        }
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Distortion {
    fn name(&self) -> &'static str {
        "distortion"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::DRIVE) {
            self.set_drive(v);
        }
        if let Some(v) = params.float(&Self::TONE) {
            self.set_tone(v);
        }
        if let Some(v) = params.choice(&Self::MODE) {
            self.set_mode(DistortionMode::from_name(v));
        }
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        super::map_channels(input, |ch| {
            let shaped: Vec<f32> = ch.iter().map(|&x| self.shape(x)).collect();
            if self.tone < Self::TONE_BYPASS {
                one_pole_lowpass(&shaped, (1.0 - self.tone) * 0.99)
            } else {
                shaped
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_contract() {
        for mode in ["tube", "fuzz", "digital", "scream"] {
            let mut dist = Distortion::new();
            dist.configure(&ParamSet::new().with("mode", mode).with("drive", 20.0));
            check_contract(&dist);
        }
    }

    #[test]
    fn test_curves_are_bounded_and_odd() {
        for mode in [
            DistortionMode::Tube,
            DistortionMode::Digital,
            DistortionMode::Scream,
        ] {
            let mut dist = Distortion::new();
            dist.set_mode(mode);
            for x in [0.05f32, 0.3, 0.9] {
                let y = dist.shape(x);
                assert!(y.abs() <= 1.0, "{:?}", mode);
                assert!((y + dist.shape(-x)).abs() < 1e-6, "{:?} not odd", mode);
            }
        }
    }

    #[test]
    fn test_fuzz_rectifies() {
        let mut dist = Distortion::new();
        dist.set_mode(DistortionMode::Fuzz);
        for x in [0.05f32, 0.3, 0.9] {
            let y = dist.shape(x);
            assert!(y > 0.0 && y <= 1.0);
            assert!((dist.shape(-x) - y).abs() < 1e-6, "fuzz at -{}", x);
        }
    }

    #[test]
    fn test_digital_quantizes() {
        let mut dist = Distortion::new();
        dist.set_mode(DistortionMode::Digital);
        dist.set_drive(4.0);
        // 4 steps per unit after drive
        assert_eq!(dist.shape(0.1), 0.5);
    }

    #[test]
    fn test_dark_tone_removes_highs() {
        let input = mono_sine(8000.0, 4410);
        let mut bright = Distortion::new();
        bright.set_drive(1.0);
        bright.set_tone(1.0);
        let mut dark = bright.clone();
        dark.set_tone(0.0);
        let b = rms(bright.process(&input, SR).samples());
        let d = rms(dark.process(&input, SR).samples());
        assert!(d < b * 0.2, "bright {} dark {}", b, d);
    }
}
