//! Pitch effects
//!
//! - `PitchShift` keeps duration (vocoder stretch + resample), optionally
//!   moving the spectral envelope back so voices do not turn chipmunk
//! - `PitchShiftSimple` resamples once, so duration changes with pitch
//! - `FormantShift` moves only the spectral envelope

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::{self, fft_resample, micro_fade, micro_fade_buffer, shift_formants};
use crate::params::{ParamSet, ParamSpec};

/// Fade applied at both ends of a shifted segment (frames)
const EDGE_FADE: usize = 64;

#[inline]
fn pitch_ratio(semitones: f32) -> f64 {
    2.0f64.powf(semitones as f64 / 12.0)
}

/// Duration-preserving pitch shift
#[derive(Debug, Clone)]
pub struct PitchShift {
    semitones: f32,
    preserve_formants: bool,
}

impl PitchShift {
    const SEMITONES: ParamSpec = ParamSpec::float("semitones", -24.0, 24.0, 0.0);
    const PRESERVE_FORMANTS: ParamSpec = ParamSpec::bool("preserve_formants", false);
    const SCHEMA: &'static [ParamSpec] = &[Self::SEMITONES, Self::PRESERVE_FORMANTS];

    pub fn new() -> Self {
        Self {
            semitones: Self::SEMITONES.default_float(),
            preserve_formants: Self::PRESERVE_FORMANTS.default_bool(),
        }
    }

    pub fn with_semitones(semitones: f32) -> Self {
        let mut shift = Self::new();
        shift.set_semitones(semitones);
        shift
    }

    pub fn set_semitones(&mut self, semitones: f32) {
        self.semitones = Self::SEMITONES.clamp_float(semitones);
    }

    pub fn set_preserve_formants(&mut self, on: bool) {
        self.preserve_formants = on;
    }
}

impl Default for PitchShift {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for PitchShift {
    fn name(&self) -> &'static str {
        "pitch_shift"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::SEMITONES) {
            self.set_semitones(v);
        }
        if let Some(v) = params.bool(&Self::PRESERVE_FORMANTS) {
            self.set_preserve_formants(v);
        }
    }

    fn min_frames(&self) -> usize {
        64
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        if self.semitones == 0.0 {
            return input.clone();
        }
        super::map_channels(input, |ch| {
            let mut shifted = dsp::pitch_shift(ch, self.semitones);
            if self.preserve_formants {
                shifted = shift_formants(&shifted, -self.semitones, sample_rate);
            }
            micro_fade(&mut shifted, EDGE_FADE);
            shifted
        })
    }
}

/// Single-resample pitch shift; higher pitch means shorter audio
#[derive(Debug, Clone)]
pub struct PitchShiftSimple {
    semitones: f32,
}

impl PitchShiftSimple {
    const SEMITONES: ParamSpec = ParamSpec::float("semitones", -24.0, 24.0, 0.0);
    const SCHEMA: &'static [ParamSpec] = &[Self::SEMITONES];

    pub fn new() -> Self {
        Self {
            semitones: Self::SEMITONES.default_float(),
        }
    }

    pub fn set_semitones(&mut self, semitones: f32) {
        self.semitones = Self::SEMITONES.clamp_float(semitones);
    }

    /// Output frame count for an input of `len` frames
    pub fn output_frames(&self, len: usize) -> usize {
        (len as f64 / pitch_ratio(self.semitones)) as usize
    }
}

impl Default for PitchShiftSimple {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for PitchShiftSimple {
    fn name(&self) -> &'static str {
        "pitch_shift_simple"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::SEMITONES) {
            self.set_semitones(v);
        }
    }

    fn length_altering(&self) -> bool {
        true
    }

    fn process(&self, input: &AudioBuffer, _sample_rate: u32) -> AudioBuffer {
        let new_len = self.output_frames(input.frames());
        if new_len < 2 {
            return input.clone();
        }
        let mut output = super::map_channels(input, |ch| fft_resample(ch, new_len));
        micro_fade_buffer(&mut output, EDGE_FADE);
        output
    }
}

/// Spectral-envelope shift with the pitch left alone
#[derive(Debug, Clone)]
pub struct FormantShift {
    semitones: f32,
}

impl FormantShift {
    const SEMITONES: ParamSpec = ParamSpec::float("semitones", -12.0, 12.0, 0.0);
    const SCHEMA: &'static [ParamSpec] = &[Self::SEMITONES];

    pub fn new() -> Self {
        Self {
            semitones: Self::SEMITONES.default_float(),
        }
    }

    pub fn set_semitones(&mut self, semitones: f32) {
        self.semitones = Self::SEMITONES.clamp_float(semitones);
    }
}

impl Default for FormantShift {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for FormantShift {
    fn name(&self) -> &'static str {
        "formant_shift"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::SEMITONES) {
            self.set_semitones(v);
        }
    }

    fn min_frames(&self) -> usize {
        64
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        super::map_channels(input, |ch| shift_formants(ch, self.semitones, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::buffer::Segment;

    fn rising_crossings(x: &[f32]) -> usize {
        x.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count()
    }

    #[test]
    fn test_contract() {
        check_contract(&PitchShift::with_semitones(5.0));
        let mut formants = PitchShift::with_semitones(-7.0);
        formants.set_preserve_formants(true);
        check_contract(&formants);
        let mut simple = PitchShiftSimple::new();
        simple.set_semitones(12.0);
        check_contract(&simple);
        let mut formant = FormantShift::new();
        formant.set_semitones(4.0);
        check_contract(&formant);
    }

    #[test]
    fn test_pitch_shift_keeps_length_and_moves_pitch() {
        let input = mono_sine(220.0, 44_100);
        let output = PitchShift::with_semitones(12.0).process(&input, SR);
        assert_eq!(output.frames(), 44_100);
        let crossings = rising_crossings(output.samples()) as i32;
        assert!((crossings - 440).abs() <= 8, "crossings {}", crossings);
    }

    #[test]
    fn test_shift_up_then_down_matches_original() {
        let input = mono_sine(220.0, 44_100);
        let up = PitchShift::with_semitones(5.0).process(&input, SR);
        let back = PitchShift::with_semitones(-5.0).process(&up, SR);
        let a = &input.samples()[4096..40_000];
        let b = back.samples();
        // Best normalized correlation within one period of lag
        let best = (0..200)
            .map(|lag| {
                let b = &b[4096 - 100 + lag..40_000 - 100 + lag];
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm = (a.iter().map(|x| x * x).sum::<f32>() * b.iter().map(|y| y * y).sum::<f32>()).sqrt();
                dot / norm.max(1e-9)
            })
            .fold(f32::MIN, f32::max);
        assert!(best > 0.9, "correlation {}", best);
    }

    #[test]
    fn test_zero_semitones_is_identity() {
        let input = stereo_sine(440.0, 2048);
        assert_eq!(PitchShift::new().process(&input, SR), input);
    }

    #[test]
    fn test_simple_changes_duration() {
        let input = stereo_sine(440.0, 10_000);
        let mut simple = PitchShiftSimple::new();
        simple.set_semitones(12.0);
        assert_eq!(simple.output_frames(10_000), 5000);

        let output = simple.apply(&input, Segment::new(2000, 6000), SR);
        assert_eq!(output.frames(), 10_000 - 2000);
        assert_eq!(output.samples()[..4000], input.samples()[..4000]);

        simple.set_semitones(-12.0);
        let output = simple.apply(&input, Segment::new(2000, 6000), SR);
        assert_eq!(output.frames(), 10_000 + 4000);
    }

    #[test]
    fn test_simple_one_octave_up_doubles_frequency() {
        let input = mono_sine(200.0, 44_100);
        let mut simple = PitchShiftSimple::new();
        simple.set_semitones(12.0);
        let output = simple.process(&input, SR);
        // Half the frames, same number of cycles
        let crossings = rising_crossings(output.samples()) as i32;
        assert!((crossings - 200).abs() <= 2);
    }

    #[test]
    fn test_formant_shift_keeps_pitch() {
        let input = mono_sine(300.0, 44_100);
        let mut formant = FormantShift::new();
        formant.set_semitones(5.0);
        let output = formant.process(&input, SR);
        assert_eq!(output.frames(), input.frames());
        let crossings = rising_crossings(&output.samples()[4096..40_000]) as i32;
        let expected = rising_crossings(&input.samples()[4096..40_000]) as i32;
        assert!((crossings - expected).abs() <= 3);
    }
}
