//! Autocorrelation pitch detection
//!
//! A frame is mean-removed, Hann-windowed and correlated with itself through
//! an FFT (zero-padded past `2n - 1` so the correlation is linear, not
//! circular). The result is divided by the window's own autocorrelation,
//! which removes the downward tilt the taper puts on long lags. The strongest
//! peak inside the lag window wins and is refined to sub-sample precision
//! with a parabola through its neighbours.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Lowest frequency searched by default (Hz)
pub const DEFAULT_FMIN: f32 = 80.0;

/// Highest frequency searched by default (Hz)
pub const DEFAULT_FMAX: f32 = 800.0;

/// Normalized correlation a peak must reach to count as voiced
const VOICING_THRESHOLD: f32 = 0.3;

/// An earlier peak within this fraction of the best one is preferred (octave guard)
const OCTAVE_TOLERANCE: f32 = 0.9;

/// Frames quieter than this are treated as silence
const SILENCE_FLOOR: f32 = 1e-5;

/// Shortest frame worth analysing
const MIN_FRAME: usize = 64;

/// Lags where the window's own correlation falls below this are not searched
const WINDOW_ACF_FLOOR: f32 = 0.01;

/// FFT-based autocorrelation pitch detector
///
/// The detector owns its FFT plans, window and scratch buffers, so repeated
/// calls do not allocate.
pub struct PitchDetector {
    sample_rate: u32,
    frame_size: usize,
    fmin: f32,
    fmax: f32,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Normalized autocorrelation of the window
    window_acf: Vec<f32>,
    /// Longest lag the window correlation can still be divided out at
    lag_limit: usize,
    buffer: Vec<Complex<f32>>,
    acf: Vec<f32>,
}

impl PitchDetector {
    /// Create a detector for frames of `frame_size` samples searching 80-800 Hz
    pub fn new(sample_rate: u32, frame_size: usize) -> Self {
        Self::with_range(sample_rate, frame_size, DEFAULT_FMIN, DEFAULT_FMAX)
    }

    /// Create a detector with a custom search range
    pub fn with_range(sample_rate: u32, frame_size: usize, fmin: f32, fmax: f32) -> Self {
        let frame_size = frame_size.max(MIN_FRAME);
        let fft_size = (2 * frame_size - 1).next_power_of_two();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);

        let window: Vec<f32> = (0..frame_size)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (frame_size - 1) as f32).cos())
            .collect();

        let fmin = fmin.max(1.0);
        let fmax = fmax.max(fmin + 1.0);

        let mut detector = Self {
            sample_rate: sample_rate.max(1),
            frame_size,
            fmin,
            fmax,
            fft,
            ifft,
            window_acf: vec![0.0; frame_size],
            lag_limit: frame_size - 1,
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            acf: vec![0.0; frame_size],
        };

        detector.load_buffer(|_, w| w);
        detector.autocorrelate();
        detector.window_acf.copy_from_slice(&detector.acf);
        detector.lag_limit = detector
            .window_acf
            .iter()
            .rposition(|&v| v >= WINDOW_ACF_FLOOR)
            .unwrap_or(0);

        detector
    }

    /// Frame size this detector was planned for
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Detect the fundamental frequency of a raw (unwindowed) frame
    ///
    /// Returns `None` for silent, unvoiced or too-short frames. Frames longer
    /// than the planned size are truncated, shorter ones zero-padded.
    pub fn detect(&mut self, frame: &[f32]) -> Option<f32> {
        let n = frame.len().min(self.frame_size);
        if n < MIN_FRAME {
            return None;
        }

        let mean = frame[..n].iter().sum::<f32>() / n as f32;
        let peak = frame[..n]
            .iter()
            .map(|s| (s - mean).abs())
            .fold(0.0f32, f32::max);
        if peak < SILENCE_FLOOR {
            return None;
        }

        self.load_buffer(|i, w| if i < n { (frame[i] - mean) * w } else { 0.0 });
        self.autocorrelate();

        let sr = self.sample_rate as f32;
        let min_lag = ((sr / self.fmax) as usize).max(2);
        let max_lag = ((sr / self.fmin) as usize).min(self.lag_limit);
        if min_lag + 2 >= max_lag {
            return None;
        }

        for lag in 0..=max_lag {
            self.acf[lag] /= self.window_acf[lag].max(1e-6);
        }
        let acf = &self.acf;

        // Skip the slope falling away from lag zero so it can't win
        let mut first = min_lag;
        while first + 1 < max_lag && acf[first + 1] <= acf[first] {
            first += 1;
        }

        let mut best = first;
        for lag in first..max_lag {
            if acf[lag] > acf[best] {
                best = lag;
            }
        }

        if acf[best] < VOICING_THRESHOLD {
            tracing::trace!(peak = acf[best], "unvoiced frame");
            return None;
        }

        // Prefer the earliest local peak nearly as strong as the best
        for lag in (first + 1)..best {
            if acf[lag] >= acf[lag - 1]
                && acf[lag] >= acf[lag + 1]
                && acf[lag] >= acf[best] * OCTAVE_TOLERANCE
            {
                best = lag;
                break;
            }
        }

        let lag = if best > min_lag && best + 1 < max_lag {
            best as f32 + parabolic_offset(acf[best - 1], acf[best], acf[best + 1])
        } else {
            best as f32
        };

        if lag <= 0.0 {
            return None;
        }

        Some(sr / lag)
    }

    /// Fill the FFT buffer from `f(index, window_value)`
    fn load_buffer(&mut self, f: impl Fn(usize, f32) -> f32) {
        let frame_size = self.frame_size;
        for (i, bin) in self.buffer.iter_mut().enumerate() {
            let w = if i < frame_size { self.window[i] } else { 0.0 };
            *bin = Complex::new(if i < frame_size { f(i, w) } else { 0.0 }, 0.0);
        }
    }

    /// Autocorrelate the buffer contents into `acf`, normalized to lag zero
    fn autocorrelate(&mut self) {
        // |X|^2 back through the inverse transform is the autocorrelation
        self.fft.process(&mut self.buffer);
        for bin in self.buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.ifft.process(&mut self.buffer);

        let norm = self.buffer[0].re + 1e-12;
        for (value, bin) in self.acf.iter_mut().zip(self.buffer.iter()) {
            *value = bin.re / norm;
        }
    }
}

/// Vertex offset of the parabola through three equally spaced points
#[inline]
fn parabolic_offset(a: f32, b: f32, c: f32) -> f32 {
    let denom = a - 2.0 * b + c;
    if denom.abs() < 1e-10 {
        return 0.0;
    }
    (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin() * 0.5)
            .collect()
    }

    fn cents(freq: f32, target: f32) -> f32 {
        1200.0 * (freq / target).log2()
    }

    #[test]
    fn test_detects_a440() {
        let mut detector = PitchDetector::new(44100, 2048);
        let freq = detector.detect(&sine(440.0, 44100, 2048)).unwrap();
        assert!(cents(freq, 440.0).abs() < 5.0, "detected {}", freq);
    }

    #[test]
    fn test_detects_across_range() {
        let mut detector = PitchDetector::new(48000, 2048);
        for &target in &[110.0f32, 196.0, 330.0, 523.25, 700.0] {
            let freq = detector.detect(&sine(target, 48000, 2048)).unwrap();
            assert!(
                cents(freq, target).abs() < 10.0,
                "{} Hz detected as {}",
                target,
                freq
            );
        }
    }

    #[test]
    fn test_harmonic_rich_tone_reports_fundamental() {
        let mut detector = PitchDetector::new(44100, 2048);
        let frame: Vec<f32> = (0..2048)
            .map(|i| {
                let t = i as f32 / 44100.0;
                0.4 * (2.0 * PI * 220.0 * t).sin()
                    + 0.3 * (2.0 * PI * 440.0 * t).sin()
                    + 0.2 * (2.0 * PI * 660.0 * t).sin()
            })
            .collect();
        let freq = detector.detect(&frame).unwrap();
        assert!(cents(freq, 220.0).abs() < 10.0, "detected {}", freq);
    }

    #[test]
    fn test_short_frame_reaches_low_pitches() {
        // A 1024-sample frame at 44.1 kHz holds lags past half its length
        let mut detector = PitchDetector::with_range(44100, 1024, 60.0, 1000.0);
        for &target in &[75.0f32, 82.41] {
            let freq = detector.detect(&sine(target, 44100, 1024)).unwrap();
            assert!(
                cents(freq, target).abs() < 30.0,
                "{} Hz detected as {}",
                target,
                freq
            );
        }
    }

    #[test]
    fn test_low_pitch_with_long_frame() {
        let mut detector = PitchDetector::with_range(44100, 2048, 60.0, 1000.0);
        for &target in &[65.0f32, 70.0, 82.41] {
            let freq = detector.detect(&sine(target, 44100, 2048)).unwrap();
            assert!(cents(freq, target).abs() < 5.0, "{} Hz detected as {}", target, freq);
        }
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let mut detector = PitchDetector::new(44100, 2048);
        assert!(detector.detect(&vec![0.0; 2048]).is_none());
        assert!(detector.detect(&vec![0.25; 2048]).is_none());
    }

    #[test]
    fn test_noise_is_unvoiced() {
        let mut detector = PitchDetector::new(44100, 2048);
        let mut state = 0x2545_f491u32;
        let noise: Vec<f32> = (0..2048)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();
        assert!(detector.detect(&noise).is_none());
    }

    #[test]
    fn test_short_frame_rejected() {
        let mut detector = PitchDetector::new(44100, 2048);
        assert!(detector.detect(&sine(440.0, 44100, 32)).is_none());
    }

    #[test]
    fn test_parabolic_offset() {
        assert_eq!(parabolic_offset(0.5, 1.0, 0.5), 0.0);
        // Higher left neighbour pulls the vertex left
        assert!(parabolic_offset(0.9, 1.0, 0.5) < 0.0);
        assert!(parabolic_offset(0.5, 1.0, 0.9) > 0.0);
    }
}
