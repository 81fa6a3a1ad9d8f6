//! OTT - aggressive three-band upward-leaning compression
//!
//! The segment is summed to mono, split at 200 Hz and 5 kHz with 4th-order
//! Butterworth sections, squashed per band, given a flat makeup gain and
//! summed again. Stereo input gets the same mono result on both channels.

use super::Effect;
use crate::buffer::AudioBuffer;
use crate::dsp::{FilterKind, SosFilter};
use crate::params::{ParamSet, ParamSpec};

const BAND_ORDER: usize = 4;
const LOW_SPLIT_HZ: f32 = 200.0;
const HIGH_SPLIT_HZ: f32 = 5000.0;

/// Per-band static compressor
#[derive(Debug, Clone, Copy)]
struct BandCompressor {
    threshold: f32,
    ratio: f32,
}

const LOW_BAND: BandCompressor = BandCompressor {
    threshold: 0.1,
    ratio: 8.0,
};
const MID_BAND: BandCompressor = BandCompressor {
    threshold: 0.08,
    ratio: 10.0,
};
const HIGH_BAND: BandCompressor = BandCompressor {
    threshold: 0.05,
    ratio: 12.0,
};

impl BandCompressor {
    /// Squash everything above the threshold, then apply makeup and clip
    fn compress(&self, band: &[f32], depth: f32) -> Vec<f32> {
        let makeup = 1.0 + depth * 2.0;
        band.iter()
            .map(|&x| {
                let level = x.abs();
                let mut gain = 1.0;
                if level > self.threshold {
                    let target = self.threshold + (level - self.threshold) / self.ratio;
                    let full = target / (level + 1e-10);
                    gain = 1.0 + (full - 1.0) * depth;
                }
                (x * gain * makeup).clamp(-1.0, 1.0)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Ott {
    depth: f32,
}

impl Ott {
    const DEPTH: ParamSpec = ParamSpec::float("depth", 0.0, 1.0, 0.7);
    const SCHEMA: &'static [ParamSpec] = &[Self::DEPTH];

    pub fn new() -> Self {
        Self {
            depth: Self::DEPTH.default_float(),
        }
    }

    /// Set intensity (0 = flat, 1 = maximum squash)
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = Self::DEPTH.clamp_float(depth);
    }

    /// Split `mono` into low, mid and high bands
    fn split(mono: &[f32], sample_rate: u32) -> [Vec<f32>; 3] {
        let top = sample_rate as f32 / 2.0 * 0.95;
        let low = SosFilter::butterworth(FilterKind::Lowpass, BAND_ORDER, LOW_SPLIT_HZ, sample_rate)
            .process(mono);
        let mid = SosFilter::bandpass(BAND_ORDER, LOW_SPLIT_HZ, HIGH_SPLIT_HZ.min(top), sample_rate)
            .process(mono);
        // Low sample rates leave no room above the upper split
        let high = if HIGH_SPLIT_HZ < top {
            SosFilter::bandpass(BAND_ORDER, HIGH_SPLIT_HZ, top, sample_rate).process(mono)
        } else {
            vec![0.0; mono.len()]
        };
        [low, mid, high]
    }
}

impl Default for Ott {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Ott {
    fn name(&self) -> &'static str {
        "ott"
    }

    fn schema(&self) -> &'static [ParamSpec] {
        Self::SCHEMA
    }

    fn configure(&mut self, params: &ParamSet) {
        if let Some(v) = params.float(&Self::DEPTH) {
            self.set_depth(v);
        }
    }

    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer {
        let [low, mid, high] = Self::split(&input.to_mono(), sample_rate);
        let low = LOW_BAND.compress(&low, self.depth);
        let mid = MID_BAND.compress(&mid, self.depth);
        let high = HIGH_BAND.compress(&high, self.depth);

        let combined: Vec<f32> = low
            .iter()
            .zip(mid.iter())
            .zip(high.iter())
            .map(|((l, m), h)| (l + m + h).clamp(-1.0, 1.0))
            .collect();
        AudioBuffer::from_mono(combined).with_channels(input.channels())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[test]
    fn test_contract() {
        check_contract(&Ott::new());
    }

    #[test]
    fn test_band_compression_curve() {
        let out = MID_BAND.compress(&[0.5, -0.5, 0.05], 1.0);
        // 0.08 + 0.42 / 10 = 0.122, times makeup 3
        assert!((out[0] - 0.366).abs() < 1e-4);
        assert!((out[1] + 0.366).abs() < 1e-4);
        // Below threshold only makeup applies
        assert!((out[2] - 0.15).abs() < 1e-6);

        let flat = MID_BAND.compress(&[0.5, 0.05], 0.0);
        assert_eq!(flat, vec![0.5, 0.05]);
    }

    #[test]
    fn test_narrows_dynamic_range() {
        let mut samples = sine(1000.0, 44100, 0.8);
        samples[22050..].iter_mut().for_each(|s| *s *= 0.05 / 0.8);
        let input = AudioBuffer::from_mono(samples);

        let mut ott = Ott::new();
        ott.set_depth(1.0);
        let output = ott.process(&input, SR);

        let range = |x: &[f32]| rms(&x[4410..22050]) / rms(&x[26460..]);
        let before = range(input.samples());
        let after = range(output.samples());
        assert!((before - 16.0).abs() < 0.5);
        assert!(after < before * 0.5, "before {} after {}", before, after);
    }

    #[test]
    fn test_stereo_channels_match() {
        let input = AudioBuffer::from_planar(&[sine(300.0, 8192, 0.6), noise(8192, 1)]);
        let output = Ott::new().process(&input, SR);
        assert!(output.is_stereo());
        assert_eq!(output.channel(0), output.channel(1));
    }

    #[test]
    fn test_low_sample_rate() {
        let input = AudioBuffer::from_mono(noise(4000, 2));
        let output = Ott::new().process(&input, 8000);
        assert_eq!(output.frames(), 4000);
        assert!(output.samples().iter().all(|v| v.is_finite()));
    }
}
