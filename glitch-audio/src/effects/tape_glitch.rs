//! Tape glitch: wow, flutter, micro-glitches, dropouts and hiss
//!
//! Speed wobble is rendered by integrating a playback-speed curve into a
//! fractional read position and interpolating the segment there. All random
//! choices are drawn once per call and applied to every channel alike, so
//! stereo images stay locked.

use super::{seeded_rng, Effect};
use crate::buffer::AudioBuffer;
use crate::dsp::{micro_fade, warp_read, FilterKind, SosFilter};
use crate::params::{ParamSet, ParamSpec};
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::PI;

/// Micro-glitches per second at `glitch_rate = 1`
const GLITCHES_PER_SEC: f32 = 15.0;

/// Dropout attempts per second at `dropout_chance = 1`
const DROPOUTS_PER_SEC: f32 = 5.0;

const MAX_GLITCH: usize = 2048;
const MIN_GLITCH: usize = 64;
const MAX_DROPOUT: usize = 4096;
const MIN_DROPOUT: usize = 128;

/// Hiss sits above this frequency
const HISS_CUTOFF_HZ: f32 = 3000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlitchKind {
    /// Copy `len` frames from `source` over `pos`
    Repeat { source: usize },
    /// Play the span backwards
    Reverse,
    /// Hold the first sample of the span
    Freeze,
}

#[derive(Debug, Clone, Copy)]
struct Glitch {
    pos: usize,
    len: usize,
    kind: GlitchKind,
}

/// Everything random about one call
#[derive(Debug, Clone)]
struct GlitchPlan {
    wow: Option<(f64, f64)>,
    flutter: Option<f64>,
    glitches: Vec<Glitch>,
    dropouts: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct TapeGlitch {
    glitch_rate: f32,
    dropout_chance: f32,
    wow: f32,
    flutter: f32,
    noise: f32,
    seed: i64,
}

impl TapeGlitch {
    const GLITCH_RATE: ParamSpec = ParamSpec::float("glitch_rate", 0.0, 1.0, 0.4);
    const DROPOUT_CHANCE: ParamSpec = ParamSpec::float("dropout_chance", 0.0, 1.0, 0.15);
    const WOW: ParamSpec = ParamSpec::float("wow", 0.0, 1.0, 0.3);
    const FLUTTER: ParamSpec = ParamSpec::float("flutter", 0.0, 1.0, 0.4);
    const NOISE: ParamSpec = ParamSpec::float("noise", 0.0, 1.0, 0.1);
    const SEED: ParamSpec = ParamSpec::int("seed", -1, i32::MAX as i64, -1);
    const SCHEMA: &'static [ParamSpec] = &[
        Self::GLITCH_RATE,
        Self::DROPOUT_CHANCE,
        Self::WOW,
        Self::FLUTTER,
        Self::NOISE,
        Self::SEED,
    ];

    pub fn new() -> Self {
        Self {
            glitch_rate: Self::GLITCH_RATE.default_float(),
            dropout_chance: Self::DROPOUT_CHANCE.default_float(),
            wow: Self::WOW.default_float(),
            flutter: Self::FLUTTER.default_float(),
            noise: Self::NOISE.default_float(),
            seed: Self::SEED.default_int(),
        }
    }

    pub fn set_glitch_rate(&mut self, rate: f32) {
        self.glitch_rate = Self::GLITCH_RATE.clamp_float(rate);
    }

    pub fn set_dropout_chance(&mut self, chance: f32) {
        self.dropout_chance = Self::DROPOUT_CHANCE.clamp_float(chance);
    }

    /// Slow wobble depth (0.5-2 Hz)
    pub fn set_wow(&mut self, wow: f32) {
        self.wow = Self::WOW.clamp_float(wow);
    }

    /// Fast wobble depth (6-16 Hz)
    pub fn set_flutter(&mut self, flutter: f32) {
        self.flutter = Self::FLUTTER.clamp_float(flutter);
    }

    pub fn set_noise(&mut self, noise: f32) {
        self.noise = Self::NOISE.clamp_float(noise);
    }

    /// Fixed seed, or -1 to derive one from the segment length
    pub fn set_seed(&mut self, seed: i64) {
        self.seed = Self::SEED.clamp_int(seed);
    }

    fn effective_seed(&self, len: usize) -> i64 {
        if self.seed < 0 {
            (len as u64 % (1 << 31)) as i64
        } else {
            self.seed
        }
    }

    fn plan(&self, n: usize, sample_rate: u32, rng: &mut StdRng) -> GlitchPlan {
        let secs = n as f32 / sample_rate.max(1) as f32;

        let wow = (self.wow > 0.01).then(|| {
            let freq = 0.5 + rng.gen::<f64>() * 1.5;
            let phase = rng.gen::<f64>() * 2.0 * PI;
            (freq, phase)
        });
        let flutter = (self.flutter > 0.01).then(|| 6.0 + rng.gen::<f64>() * 10.0);

        let mut glitches = Vec::new();
        if self.glitch_rate > 0.01 {
            let count = (self.glitch_rate * secs * GLITCHES_PER_SEC) as usize;
            for _ in 0..count {
                let pos = rng.gen_range(0..n.saturating_sub(MAX_GLITCH).max(1));
                let longest = MAX_GLITCH.min(n - pos);
                if longest <= MIN_GLITCH {
                    continue;
                }
                let len = rng.gen_range(MIN_GLITCH..longest);
                let kind = match rng.gen_range(0..3) {
                    0 => GlitchKind::Repeat {
                        source: rng.gen_range(0..n.saturating_sub(len).max(1)),
                    },
                    1 => GlitchKind::Reverse,
                    _ => GlitchKind::Freeze,
                };
                glitches.push(Glitch { pos, len, kind });
            }
        }

        let mut dropouts = Vec::new();
        if self.dropout_chance > 0.01 {
            let count = ((self.dropout_chance * secs * DROPOUTS_PER_SEC) as usize).max(1);
            for _ in 0..count {
                if rng.gen::<f32>() >= self.dropout_chance {
                    continue;
                }
                let pos = rng.gen_range(0..n.saturating_sub(MAX_DROPOUT).max(1));
                let longest = MAX_DROPOUT.min(n - pos);
                if longest <= MIN_DROPOUT {
                    continue;
                }
                dropouts.push((pos, rng.gen_range(MIN_DROPOUT..longest)));
            }
        }

        GlitchPlan {
            wow,
            flutter,
            glitches,
            dropouts,
        }
    }

    /// One playback-speed curve per enabled wobble, applied in order
    fn speed_curves(&self, plan: &GlitchPlan, n: usize, sample_rate: u32) -> Vec<Vec<f64>> {
        let sr = sample_rate.max(1) as f64;
        let mut curves = Vec::new();
        if let Some((freq, phase)) = plan.wow {
            let depth = self.wow as f64 * 0.008;
            curves.push(
                (0..n)
                    .map(|i| 1.0 + depth * (2.0 * PI * freq * i as f64 / sr + phase).sin())
                    .collect(),
            );
        }
        if let Some(freq) = plan.flutter {
            let depth = self.flutter as f64;
            curves.push(
                (0..n)
                    .map(|i| {
                        let t = i as f64 / sr;
                        1.0 + depth * 0.004 * (2.0 * PI * freq * t).sin()
                            + depth * 0.002 * (2.0 * PI * freq * 2.7 * t).sin()
                    })
                    .collect(),
            );
        }
        curves
    }

    fn degrade_channel(
        &self,
        ch: &[f32],
        plan: &GlitchPlan,
        curves: &[Vec<f64>],
        hiss: Option<&[f32]>,
    ) -> Vec<f32> {
        let mut seg = ch.to_vec();
        for speed in curves {
            seg = warp_read(&seg, speed);
        }

        for glitch in &plan.glitches {
            let end = (glitch.pos + glitch.len).min(seg.len());
            match glitch.kind {
                GlitchKind::Repeat { source } => {
                    let count = (end - glitch.pos).min(seg.len() - source);
                    seg.copy_within(source..source + count, glitch.pos);
                }
                GlitchKind::Reverse => seg[glitch.pos..end].reverse(),
                GlitchKind::Freeze => {
                    let held = seg[glitch.pos];
                    seg[glitch.pos..end].iter_mut().for_each(|s| *s = held);
                }
            }
        }

        for &(pos, len) in &plan.dropouts {
            let fade = (len / 4).min(64);
            for (k, sample) in seg[pos..pos + len].iter_mut().enumerate() {
                let env = if k < fade {
                    1.0 - k as f32 / (fade - 1).max(1) as f32
                } else if k >= len - fade {
                    (k - (len - fade)) as f32 / (fade - 1).max(1) as f32
                } else {
                    0.0
                };
                *sample *= env;
            }
        }

        if let Some(hiss) = hiss {
            seg.iter_mut().zip(hiss).for_each(|(s, h)| *s += h);
        }

        micro_fade(&mut seg, 64);
        seg
    }
}

impl Default for TapeGlitch {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for TapeGlitch {
    fn name(&self) -> &'static str {
        "tape_glitch"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::GLITCH_RATE) {
            self.set_glitch_rate(v);
        }
        if let Some(v) = params.float(&Self::DROPOUT_CHANCE) {
            self.set_dropout_chance(v);
        }
        if let Some(v) = params.float(&Self::WOW) {
            self.set_wow(v);
        }
        if let Some(v) = params.float(&Self::FLUTTER) {
            self.set_flutter(v);
        }
        if let Some(v) = params.float(&Self::NOISE) {
            self.set_noise(v);
        }
        if let Some(v) = params.int(&Self::SEED) {
            self.set_seed(v);
        }
    }

    fn min_frames(&self) -> usize {
        64
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let n = input.frames();
        let mut rng = seeded_rng(self.effective_seed(n));
        let plan = self.plan(n, sample_rate, &mut rng);
        let curves = self.speed_curves(&plan, n, sample_rate);
        let hiss_filter = SosFilter::butterworth(FilterKind::Highpass, 2, HISS_CUTOFF_HZ, sample_rate);

        super::map_channels(input, |ch| {
            let hiss = (self.noise > 0.01).then(|| {
                let level = self.noise * 0.05;
                let white: Vec<f32> = (0..n).map(|_| rng.gen_range(-level..level)).collect();
                hiss_filter.process(&white)
            });
            self.degrade_channel(ch, &plan, &curves, hiss.as_deref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    fn silent_knobs() -> TapeGlitch {
        let mut tape = TapeGlitch::new();
        tape.set_glitch_rate(0.0);
        tape.set_dropout_chance(0.0);
        tape.set_wow(0.0);
        tape.set_flutter(0.0);
        tape.set_noise(0.0);
        tape
    }

    #[test]
    fn test_contract() {
        check_contract(&TapeGlitch::new());
        let mut heavy = TapeGlitch::new();
        heavy.configure(
            &ParamSet::new()
                .with("glitch_rate", 1.0)
                .with("dropout_chance", 1.0)
                .with("wow", 1.0)
                .with("flutter", 1.0)
                .with("noise", 1.0),
        );
        check_contract(&heavy);
    }

    #[test]
    fn test_all_off_only_fades_edges() {
        let input = mono_sine(440.0, 5000);
        let output = silent_knobs().process(&input, SR);
        assert_eq!(output.samples()[64..4936], input.samples()[64..4936]);
    }

    #[test]
    fn test_length_derived_seed_is_reproducible() {
        let input = AudioBuffer::from_planar(&[noise(30_000, 1), noise(30_000, 2)]);
        let tape = TapeGlitch::new();
        assert_eq!(tape.process(&input, SR), tape.process(&input, SR));

        let mut fixed = TapeGlitch::new();
        fixed.set_seed(30_000);
        assert_eq!(fixed.process(&input, SR), tape.process(&input, SR));
    }

    #[test]
    fn test_wow_keeps_length_and_endpoints() {
        let mut tape = silent_knobs();
        tape.set_wow(1.0);
        let input = AudioBuffer::from_mono((0..20_000).map(|i| i as f32 / 40_000.0).collect());
        let output = tape.process(&input, SR);
        assert_eq!(output.frames(), 20_000);
        // A ramp is moved in time but stays monotonic inside the fades
        let s = &output.samples()[64..19_936];
        assert!(s.windows(2).all(|w| w[1] >= w[0]));
        assert_ne!(output.samples()[10_000], input.samples()[10_000]);
    }

    #[test]
    fn test_dropouts_silence_audio() {
        let mut tape = silent_knobs();
        tape.set_dropout_chance(1.0);
        let input = AudioBuffer::from_mono(vec![0.5; 88_200]);
        let output = tape.process(&input, SR);
        let silent = output.samples()[64..88_136].iter().filter(|&&s| s == 0.0).count();
        assert!(silent > 1000);
    }

    #[test]
    fn test_hiss_is_quiet() {
        let mut tape = silent_knobs();
        tape.set_noise(1.0);
        let input = AudioBuffer::from_mono(vec![0.0; 44_100]);
        let output = tape.process(&input, SR);
        let level = rms(output.samples());
        assert!(level > 0.001 && level < 0.05, "hiss rms {}", level);
    }
}
