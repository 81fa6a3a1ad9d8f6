//! Stutter: repeat the segment back to back
//!
//! Length-altering: `repeats` copies replace the original span. Copies can
//! shrink by half each time, alternate direction, and decay in level.

use super::Effect;
use crate::buffer::{AudioBuffer, Segment};
use crate::dsp::micro_fade_buffer;
use crate::params::{ParamSet, ParamSpec};

/// How successive repeats differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum StutterMode {
    /// Every repeat is the full segment
    #[default]
    Normal,
    /// Repeat `i` keeps the first `len / 2^i` frames (at least 64)
    Halving,
    /// Odd repeats play backwards
    ReverseAlt,
}

impl StutterMode {
    pub const NAMES: &'static [&'static str] = &["normal", "halving", "reverse_alt"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "halving" => StutterMode::Halving,
            "reverse_alt" => StutterMode::ReverseAlt,
            _ => StutterMode::Normal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stutter {
    repeats: usize,
    decay: f32,
    mode: StutterMode,
}

impl Stutter {
    const REPEATS: ParamSpec = ParamSpec::int("repeats", 1, 32, 4);
    const DECAY: ParamSpec = ParamSpec::float("decay", 0.0, 1.0, 0.0);
    const MODE: ParamSpec = ParamSpec::choice("stutter_mode", StutterMode::NAMES, "normal");
    const SCHEMA: &'static [ParamSpec] = &[Self::REPEATS, Self::DECAY, Self::MODE];

    pub fn new() -> Self {
        Self {
            repeats: Self::REPEATS.default_int() as usize,
            decay: Self::DECAY.default_float(),
            mode: StutterMode::default(),
        }
    }

    pub fn set_repeats(&mut self, repeats: i64) {
        self.repeats = Self::REPEATS.clamp_int(repeats) as usize;
    }

    /// Level lost per repeat (repeat `i` is scaled by `(1 - decay)^i`)
    pub fn set_decay(&mut self, decay: f32) {
        self.decay = Self::DECAY.clamp_float(decay);
    }

    pub fn set_mode(&mut self, mode: StutterMode) {
        self.mode = mode;
    }

    fn repeat(&self, source: &AudioBuffer, i: usize) -> AudioBuffer {
        let mut part = match self.mode {
            StutterMode::Normal => source.clone(),
            StutterMode::Halving => {
                let len = (source.frames() >> i.min(63)).max(64);
                source.slice(Segment::new(0, len))
            }
            StutterMode::ReverseAlt if i % 2 == 1 => reversed(source),
            StutterMode::ReverseAlt => source.clone(),
        };
        if self.decay > 0.0 {
            let gain = (1.0 - self.decay).powi(i as i32);
            part.samples_mut().iter_mut().for_each(|s| *s *= gain);
        }
        let fade = (part.frames() / 4).min(32);
        micro_fade_buffer(&mut part, fade);
        part
    }
}

/// Frame-order reversal keeping channels in place
fn reversed(buffer: &AudioBuffer) -> AudioBuffer {
    let planes: Vec<Vec<f32>> = buffer
        .to_planar()
        .into_iter()
        .map(|mut ch| {
            ch.reverse();
            ch
        })
        .collect();
    AudioBuffer::from_planar(&planes)
}

impl Default for Stutter {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Stutter {
    fn name(&self) -> &'static str {
        "stutter"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.int(&Self::REPEATS) {
            self.set_repeats(v);
        }
        if let Some(v) = params.float(&Self::DECAY) {
            self.set_decay(v);
        }
        if let Some(v) = params.choice(&Self::MODE) {
            self.set_mode(StutterMode::from_name(v));
        }
    }

    fn length_altering(&self) -> bool {
        true
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let mut source = input.clone();
        let fade = (source.frames() / 4).min(64);
        micro_fade_buffer(&mut source, fade);

        let mut output = AudioBuffer::silence(0, input.channels());
        for i in 0..self.repeats {
            output.extend(&self.repeat(&source, i));
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
        check_contract(&Stutter::new());
    }

    #[test]
    fn test_normal_multiplies_length() {
        let input = stereo_sine(440.0, 10_000);
        let mut stutter = Stutter::new();
        stutter.set_repeats(3);
        let output = stutter.apply(&input, Segment::new(2000, 4000), SR);
        assert_eq!(output.frames(), 10_000 + 2 * 2000);
        // Timeline after the stutter is shifted intact
        assert_eq!(output.samples()[2 * 8000..], input.samples()[2 * 4000..]);
    }

    #[test]
    fn test_halving_lengths() {
        let input = AudioBuffer::from_mono(vec![0.5; 1024]);
        let mut stutter = Stutter::new();
        stutter.set_repeats(6);
        stutter.set_mode(StutterMode::Halving);
        // 1024 + 512 + 256 + 128 + 64 + 64
        assert_eq!(stutter.process(&input, SR).frames(), 2048);
    }

    #[test]
    fn test_decay_and_reverse() {
        let input = AudioBuffer::from_mono((0..1000).map(|i| i as f32 / 2000.0).collect());
        let mut stutter = Stutter::new();
        stutter.configure(
            &ParamSet::new()
                .with("repeats", 2)
                .with("decay", 0.5)
                .with("stutter_mode", "reverse_alt"),
        );
        let output = stutter.process(&input, SR);
        let samples = output.samples();
        assert_eq!(samples.len(), 2000);
        // Second copy runs backwards at half level
        assert!((samples[1000 + 100] - samples[899] * 0.5).abs() < 1e-6);
    }
}
