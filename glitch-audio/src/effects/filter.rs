//! Resonant low-pass / high-pass filter with optional sweep
//!
//! Resonance selects the Butterworth order (2-8), so higher settings give a
//! steeper slope. The filter can run statefully: `process_stateful` returns
//! a `FilterState` that makes the next call continue the same stream.

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::{FilterKind, FilterState, SosFilter};
use crate::params::{ParamSet, ParamSpec};
use std::f32::consts::PI;

/// Chunks in a sweep
const SWEEP_CHUNKS: usize = 32;

/// Smallest sweep chunk (frames)
const MIN_SWEEP_CHUNK: usize = 256;

/// Lowest cutoff a sweep may reach (Hz)
const MIN_SWEEP_CUTOFF: f32 = 60.0;

/// Butterworth filter effect
#[derive(Debug, Clone)]
pub struct ResonantFilter {
    kind: FilterKind,
    cutoff_hz: f32,
    resonance: f32,
    sweep: bool,
}

impl ResonantFilter {
    const FILTER_TYPE: ParamSpec =
        ParamSpec::choice("filter_type", &["lowpass", "highpass"], "lowpass");
    const CUTOFF_HZ: ParamSpec = ParamSpec::float("cutoff_hz", 20.0, 20000.0, 2000.0);
    const RESONANCE: ParamSpec = ParamSpec::float("resonance", 0.5, 4.0, 1.0);
    const SWEEP: ParamSpec = ParamSpec::bool("sweep", false);
    const SCHEMA: &'static [ParamSpec] =
        &[Self::FILTER_TYPE, Self::CUTOFF_HZ, Self::RESONANCE, Self::SWEEP];

    pub fn new() -> Self {
        Self {
            kind: FilterKind::Lowpass,
            cutoff_hz: Self::CUTOFF_HZ.default_float(),
            resonance: Self::RESONANCE.default_float(),
            sweep: false,
        }
    }

    pub fn set_kind(&mut self, kind: FilterKind) {
        self.kind = kind;
    }

    pub fn set_cutoff_hz(&mut self, cutoff: f32) {
        self.cutoff_hz = Self::CUTOFF_HZ.clamp_float(cutoff);
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = Self::RESONANCE.clamp_float(resonance);
    }

    pub fn set_sweep(&mut self, sweep: bool) {
        self.sweep = sweep;
    }

    /// Butterworth order for the current resonance
    pub fn order(&self) -> usize {
        ((self.resonance * 2.0) as usize).clamp(2, 8)
    }

    fn design(&self, cutoff: f32, sample_rate: u32) -> SosFilter {
        let nyquist = sample_rate as f32 / 2.0;
        let cutoff = cutoff.min(nyquist * 0.95).max(20.0);
        SosFilter::butterworth(self.kind, self.order(), cutoff, sample_rate)
    }

    /// Filter continuing from `state` (zero state if `None`)
    ///
    /// Returns the output and the state to pass into the next call. A sweep
    /// restarts its filter every chunk, so it always returns zero state.
    pub fn process_stateful(
        &self,
        input: &AudioBuffer,
        sample_rate: u32,
        state: Option<FilterState>,
    ) -> (AudioBuffer, FilterState) {
        let filter = self.design(self.cutoff_hz, sample_rate);
        if self.sweep {
            let output = self.sweep_chunks(input, sample_rate);
            return (output, FilterState::zeros(&filter, input.channels()));
        }

        let mut state = state.unwrap_or_else(|| FilterState::zeros(&filter, input.channels()));
        let planes: Vec<Vec<f32>> = input
            .to_planar()
            .iter()
            .enumerate()
            .map(|(ch, samples)| filter.process_with_state(samples, state.channel_mut(ch, &filter)))
            .collect();
        (AudioBuffer::from_planar(&planes), state)
    }

    /// Re-design the filter per chunk with the cutoff on a sine sweep
    fn sweep_chunks(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let n = input.frames();
        let nyquist = sample_rate as f32 / 2.0;
        let chunk = (n / SWEEP_CHUNKS).max(MIN_SWEEP_CHUNK);
        let mut planes = vec![vec![0.0f32; n]; input.channels()];
        let source = input.to_planar();

        for i in 0..SWEEP_CHUNKS {
            let start = i * chunk;
            if start >= n {
                break;
            }
            // The last chunk absorbs the division remainder
            let end = if i == SWEEP_CHUNKS - 1 {
                n
            } else {
                (start + chunk).min(n)
            };

            let progress = i as f32 / (SWEEP_CHUNKS - 1) as f32;
            let mult = 0.5 + 0.5 * (2.0 * PI * progress).sin();
            let cutoff = (self.cutoff_hz * (0.2 + 1.6 * mult))
                .max(MIN_SWEEP_CUTOFF)
                .min(nyquist * 0.95);
            let filter = self.design(cutoff, sample_rate);

            for (plane, samples) in planes.iter_mut().zip(source.iter()) {
                let filtered = filter.process(&samples[start..end]);
                plane[start..end].copy_from_slice(&filtered);
            }
        }

        AudioBuffer::from_planar(&planes)
    }
}

impl Default for ResonantFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ResonantFilter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.choice(&Self::FILTER_TYPE) {
            self.set_kind(if v == "highpass" {
                FilterKind::Highpass
            } else {
                FilterKind::Lowpass
            });
        }
        if let Some(v) = params.float(&Self::CUTOFF_HZ) {
            self.set_cutoff_hz(v);
        }
        if let Some(v) = params.float(&Self::RESONANCE) {
            self.set_resonance(v);
        }
        if let Some(v) = params.bool(&Self::SWEEP) {
            self.set_sweep(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        self.process_stateful(input, sample_rate, None).0
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    /// Energy above `split_hz` divided by energy below it
    fn high_low_ratio(x: &[f32], split_hz: f32) -> f32 {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(x.len());
        let mut buf: Vec<Complex<f32>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
        fft.process(&mut buf);
        let split = (split_hz * x.len() as f32 / SR as f32) as usize;
        let energy = |bins: &[Complex<f32>]| bins.iter().map(|c| c.norm_sqr()).sum::<f32>();
        energy(&buf[split..x.len() / 2]) / energy(&buf[1..split])
    }

    #[test]
    fn test_contract() {
        check_contract(&ResonantFilter::new());
        let mut sweep = ResonantFilter::new();
        sweep.set_sweep(true);
        check_contract(&sweep);
    }

    #[test]
    fn test_order_follows_resonance() {
        let mut filter = ResonantFilter::new();
        filter.set_resonance(0.5);
        assert_eq!(filter.order(), 2);
        filter.set_resonance(1.7);
        assert_eq!(filter.order(), 3);
        filter.set_resonance(4.0);
        assert_eq!(filter.order(), 8);
    }

    #[test]
    fn test_lowpass_attenuates_noise_more_with_resonance() {
        let input = AudioBuffer::from_mono(noise(16384, 3));
        let before = high_low_ratio(input.samples(), 2000.0);

        let mut gentle = ResonantFilter::new();
        gentle.set_resonance(1.0);
        let mut steep = gentle.clone();
        steep.set_resonance(4.0);

        let gentle_ratio = high_low_ratio(gentle.process(&input, SR).samples(), 2000.0);
        let steep_ratio = high_low_ratio(steep.process(&input, SR).samples(), 2000.0);
        assert!(gentle_ratio < before * 0.1);
        assert!(steep_ratio < gentle_ratio);
    }

    #[test]
    fn test_highpass_removes_low_tone() {
        let mut filter = ResonantFilter::new();
        filter.configure(
            &ParamSet::new()
                .with("filter_type", "highpass")
                .with("cutoff_hz", 4000.0)
                .with("resonance", 3.0),
        );
        let input = mono_sine(100.0, 8192);
        let output = filter.process(&input, SR);
        assert!(rms(&output.samples()[4096..]) < 0.001);
    }

    #[test]
    fn test_stateful_calls_continue_stream() {
        let filter = ResonantFilter::new();
        let input = stereo_sine(3000.0, 4000);
        let whole = filter.process(&input, SR);

        let (first, state) =
            filter.process_stateful(&input.slice(crate::Segment::new(0, 1500)), SR, None);
        assert!(!state.is_zero());
        let (second, _) =
            filter.process_stateful(&input.slice(crate::Segment::new(1500, 4000)), SR, Some(state));

        let mut joined = first;
        joined.extend(&second);
        for (a, b) in whole.samples().iter().zip(joined.samples()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sweep_covers_whole_segment() {
        let mut filter = ResonantFilter::new();
        filter.set_sweep(true);
        // 32 chunks of 1000 frames plus a remainder
        let input = AudioBuffer::from_mono(vec![0.5; 32_017]);
        let output = filter.process(&input, SR);
        assert!(output.samples()[32_010].abs() > 0.1);
    }
}
