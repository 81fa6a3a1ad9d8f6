//! Saturation: soft clip, hard clip, overdrive

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::params::{ParamSet, ParamSpec};

/// Saturation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SaturationMode {
    /// `tanh(x * drive)`
    #[default]
    Soft,
    /// Clip at `1 / drive` and renormalize
    Hard,
    /// Asymmetric `tanh` with an optional smoothing filter
    Overdrive,
}

impl SaturationMode {
    pub const NAMES: &'static [&'static str] = &["soft", "hard", "overdrive"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "hard" => SaturationMode::Hard,
            "overdrive" => SaturationMode::Overdrive,
            _ => SaturationMode::Soft,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Saturation {
    mode: SaturationMode,
    drive: f32,
    tone: f32,
}

impl Saturation {
    const MODE: ParamSpec = ParamSpec::choice("mode", SaturationMode::NAMES, "soft");
    const DRIVE: ParamSpec = ParamSpec::float("drive", 0.5, 20.0, 2.0);
    const TONE: ParamSpec = ParamSpec::float("tone", 0.0, 1.0, 1.0);
    const SCHEMA: &'static [ParamSpec] = &[Self::MODE, Self::DRIVE, Self::TONE];

    pub fn new() -> Self {
        Self {
            mode: SaturationMode::default(),
            drive: Self::DRIVE.default_float(),
            tone: Self::TONE.default_float(),
        }
    }

    pub fn set_mode(&mut self, mode: SaturationMode) {
        self.mode = mode;
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = Self::DRIVE.clamp_float(drive);
    }

    /// Overdrive brightness (below 0.5 the output is smoothed)
    pub fn set_tone(&mut self, tone: f32) {
        self.tone = Self::TONE.clamp_float(tone);
    }

    fn saturate(&self, ch: &[f32]) -> Vec<f32> {
        match self.mode {
            SaturationMode::Soft => ch.iter().map(|&x| (x * self.drive).tanh()).collect(),
            SaturationMode::Hard => {
                let threshold = (1.0 / self.drive).clamp(0.05, 1.0);
                ch.iter()
                    .map(|&x| x.clamp(-threshold, threshold) / threshold)
                    .collect()
            }
            SaturationMode::Overdrive => {
                let driven: Vec<f32> = ch
                    .iter()
                    .map(|&x| {
                        let x = x * self.drive;
                        if x >= 0.0 {
                            x.tanh()
                        } else {
                            (x * 0.8).tanh() * 1.2
                        }
                    })
                    .collect();
                if self.tone < 0.5 {
                    moving_average(&driven, ((1.0 - self.tone) * 8.0) as usize + 1)
                } else {
                    driven
                }
            }
        }
    }
}

/// Centered moving average with zero padding at the ends
fn moving_average(input: &[f32], kernel: usize) -> Vec<f32> {
    let n = input.len();
    let back = (kernel - 1) / 2;
    let scale = 1.0 / kernel as f32;
    (0..n)
        .map(|i| {
            let hi = (i + back).min(n.saturating_sub(1));
            let lo = (i + back + 1).saturating_sub(kernel);
            input[lo..=hi].iter().sum::<f32>() * scale
        })
        .collect()
}

impl Default for Saturation {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Saturation {
    fn name(&self) -> &'static str {
        "saturation"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.choice(&Self::MODE) {
            self.set_mode(SaturationMode::from_name(v));
        }
        if let Some(v) = params.float(&Self::DRIVE) {
            self.set_drive(v);
        }
        if let Some(v) = params.float(&Self::TONE) {
            self.set_tone(v);
        }
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        super::map_channels(input, |ch| self.saturate(ch))
    }
}
