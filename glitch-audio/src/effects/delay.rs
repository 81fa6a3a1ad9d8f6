//! Feedback delay with BPM sync, ping-pong and in-loop tone filter
//!
//! Echoes are rendered offline: echo `i` is the segment shifted by `i`
//! delay lengths and scaled by `feedback^i`. The tone filter runs `i` times
//! over echo `i`, so later repeats come back progressively darker.

use super::{ms_to_frames, Effect};
use crate::buffer::AudioBuffer;
use crate::dsp::one_pole_lowpass;
use crate::params::{ParamSet, ParamSpec};

/// Most echoes ever rendered
const MAX_ECHOES: usize = 30;

/// Echoes quieter than this are dropped
const MIN_ECHO_GAIN: f32 = 0.01;

/// Tempo-synced delay length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum NoteDivision {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    DottedQuarter,
    DottedEighth,
    DottedSixteenth,
    TripletQuarter,
    TripletEighth,
    TripletSixteenth,
}

impl NoteDivision {
    pub const NAMES: &'static [&'static str] = &[
        "1/1", "1/2", "1/4", "1/8", "1/16", "1/4.", "1/8.", "1/16.", "1/4t", "1/8t", "1/16t",
    ];

    const ALL: [NoteDivision; 11] = [
        NoteDivision::Whole,
        NoteDivision::Half,
        NoteDivision::Quarter,
        NoteDivision::Eighth,
        NoteDivision::Sixteenth,
        NoteDivision::DottedQuarter,
        NoteDivision::DottedEighth,
        NoteDivision::DottedSixteenth,
        NoteDivision::TripletQuarter,
        NoteDivision::TripletEighth,
        NoteDivision::TripletSixteenth,
    ];

    pub fn from_name(name: &str) -> Self {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
            .unwrap_or_default()
    }

    /// Length in quarter-note beats
    pub fn beats(self) -> f32 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::DottedQuarter => 1.5,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::DottedSixteenth => 0.375,
            NoteDivision::TripletQuarter => 2.0 / 3.0,
            NoteDivision::TripletEighth => 1.0 / 3.0,
            NoteDivision::TripletSixteenth => 1.0 / 6.0,
        }
    }
}

/// Offline echo generator
#[derive(Debug, Clone)]
pub struct Delay {
    delay_ms: f32,
    sync: bool,
    bpm: f32,
    division: NoteDivision,
    feedback: f32,
    mix: f32,
    ping_pong: bool,
    tone: f32,
}

impl Delay {
    const DELAY_MS: ParamSpec = ParamSpec::float("delay_ms", 1.0, 2000.0, 200.0);
    const SYNC: ParamSpec = ParamSpec::bool("sync", false);
    const BPM: ParamSpec = ParamSpec::float("bpm", 20.0, 300.0, 120.0);
    const DIVISION: ParamSpec = ParamSpec::choice("division", NoteDivision::NAMES, "1/4");
    const FEEDBACK: ParamSpec = ParamSpec::float("feedback", 0.0, 0.95, 0.6);
    const MIX: ParamSpec = ParamSpec::float("mix", 0.0, 1.0, 0.5);
    const PING_PONG: ParamSpec = ParamSpec::bool("ping_pong", false);
    const TONE: ParamSpec = ParamSpec::float("tone", 0.0, 1.0, 1.0);
    const SCHEMA: &'static [ParamSpec] = &[
        Self::DELAY_MS,
        Self::SYNC,
        Self::BPM,
        Self::DIVISION,
        Self::FEEDBACK,
        Self::MIX,
        Self::PING_PONG,
        Self::TONE,
    ];

    pub fn new() -> Self {
        Self {
            delay_ms: Self::DELAY_MS.default_float(),
            sync: false,
            bpm: Self::BPM.default_float(),
            division: NoteDivision::default(),
            feedback: Self::FEEDBACK.default_float(),
            mix: Self::MIX.default_float(),
            ping_pong: false,
            tone: Self::TONE.default_float(),
        }
    }

    /// Set delay time in milliseconds (used when sync is off)
    pub fn set_delay_ms(&mut self, ms: f32) {
        self.delay_ms = Self::DELAY_MS.clamp_float(ms);
    }

    /// Sync delay time to tempo
    pub fn set_sync(&mut self, bpm: f32, division: NoteDivision) {
        self.sync = true;
        self.bpm = Self::BPM.clamp_float(bpm);
        self.division = division;
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = Self::FEEDBACK.clamp_float(feedback);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = Self::MIX.clamp_float(mix);
    }

    pub fn set_ping_pong(&mut self, on: bool) {
        self.ping_pong = on;
    }

    /// Set echo brightness (1 = unfiltered, 0 = darkest)
    pub fn set_tone(&mut self, tone: f32) {
        self.tone = Self::TONE.clamp_float(tone);
    }

    /// Delay length in frames
    pub fn delay_frames(&self, sample_rate: u32) -> usize {
        let frames = if self.sync {
            let beat_secs = 60.0 / self.bpm;
            (beat_secs * self.division.beats() * sample_rate as f32).round() as usize
        } else {
            ms_to_frames(self.delay_ms, sample_rate)
        };
        frames.max(1)
    }

    /// Number of echoes before the gain falls under the floor
    fn echo_count(&self) -> usize {
        let count = (MIN_ECHO_GAIN.ln() / self.feedback.max(0.01).ln()) as usize + 1;
        count.min(MAX_ECHOES)
    }

    /// Add every echo of `source` into `outputs[target(i)]`
    fn render_echoes<F>(&self, source: &[f32], delay: usize, outputs: &mut [Vec<f32>], target: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        let n = source.len();
        let alpha = (1.0 - self.tone) * 0.9;
        let mut echo = source.to_vec();
        for i in 1..=self.echo_count() {
            let offset = i * delay;
            let gain = self.feedback.powi(i as i32);
            if offset >= n || gain < MIN_ECHO_GAIN {
                break;
            }
            if alpha > 0.0 {
                echo = one_pole_lowpass(&echo, alpha);
            }
            for (ch, out) in outputs.iter_mut().enumerate() {
                if target(i).map_or(true, |t| t == ch) {
                    for (o, &e) in out[offset..].iter_mut().zip(echo.iter()) {
                        *o += e * gain;
                    }
                }
            }
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Delay {
    fn name(&self) -> &'static str {
        "delay"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::DELAY_MS) {
            self.set_delay_ms(v);
        }
        if let Some(v) = params.bool(&Self::SYNC) {
            self.sync = v;
        }
        if let Some(v) = params.float(&Self::BPM) {
            self.bpm = v;
        }
        if let Some(v) = params.choice(&Self::DIVISION) {
            self.division = NoteDivision::from_name(v);
        }
        if let Some(v) = params.float(&Self::FEEDBACK) {
            self.set_feedback(v);
        }
        if let Some(v) = params.float(&Self::MIX) {
            self.set_mix(v);
        }
        if let Some(v) = params.bool(&Self::PING_PONG) {
            self.set_ping_pong(v);
        }
        if let Some(v) = params.float(&Self::TONE) {
            self.set_tone(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let delay = self.delay_frames(sample_rate);

        let dry: Vec<Vec<f32>> = if self.ping_pong {
            input.with_channels(2).to_planar()
        } else {
            input.to_planar()
        };
        let mut wet = dry.clone();

        if self.ping_pong {
            // Odd echoes hard left, even echoes hard right
            let source = input.to_mono();
            self.render_echoes(&source, delay, &mut wet, |i| Some((i + 1) % 2));
        } else {
            for ch in 0..dry.len() {
                let mut single = vec![std::mem::take(&mut wet[ch])];
                self.render_echoes(&dry[ch], delay, &mut single, |_| None);
                wet[ch] = single.pop().unwrap_or_default();
            }
        }

        let planes: Vec<Vec<f32>> = dry
            .iter()
            .zip(wet.iter())
            .map(|(d, w)| {
                d.iter()
                    .zip(w.iter())
                    .map(|(&d, &w)| d * (1.0 - self.mix) + w * self.mix)
                    .collect()
            })
            .collect();
        AudioBuffer::from_planar(&planes)
    }
}
