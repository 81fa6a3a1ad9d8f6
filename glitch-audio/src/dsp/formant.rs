//! Formant shifting by spectral-envelope warping
//!
//! Each STFT frame's envelope is estimated from the low quefrencies of its
//! real cepstrum. The envelope is resampled along the frequency axis by the
//! shift factor and the frame is multiplied by `warped / original`, which
//! moves resonances while the harmonic fine structure (the pitch) stays put.
//! The first and last few samples cross-fade from the input so the result
//! starts and ends where the input does.

use super::vocoder::{mirror_spectrum, normalize_overlap};
use super::window::hann_periodic;
use rustfft::{num_complex::Complex, FftPlanner};

const FRAME_SIZE: usize = 2048;
const HOP: usize = 512;

/// Smallest shift that is worth processing (semitones)
const MIN_SHIFT: f32 = 0.1;

/// Per-bin correction gain bounds (+-40 dB)
const MIN_GAIN: f32 = 0.01;
const MAX_GAIN: f32 = 100.0;

/// Cross-fade length at each edge
const EDGE_FADE: usize = 64;

/// Shift the spectral envelope of `input` by `semitones`, keeping length and pitch
pub fn shift_formants(input: &[f32], semitones: f32, sample_rate: u32) -> Vec<f32> {
    if !semitones.is_finite() || semitones.abs() < MIN_SHIFT || input.is_empty() {
        return input.to_vec();
    }

    let factor = 2.0f32.powf(semitones / 12.0);
    let size = FRAME_SIZE;
    let half = size / 2;
    let bins = half + 1;
    // Quefrency cutoff of about 1 ms
    let lifter = ((sample_rate / 1000) as usize).clamp(8, half - 1);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(size);
    let ifft = planner.plan_fft_inverse(size);
    let window = hann_periodic(size);

    let frames = input.len().div_ceil(HOP) + 1;
    let mut padded = vec![0.0f32; half];
    padded.extend_from_slice(input);
    padded.resize((frames - 1) * HOP + size, 0.0);

    let mut output = vec![0.0f32; padded.len()];
    let mut weight = vec![0.0f32; padded.len()];
    let mut spectrum = vec![Complex::new(0.0f32, 0.0); size];
    let mut cepstrum = vec![Complex::new(0.0f32, 0.0); size];
    let mut envelope = vec![0.0f32; bins];
    let scale = 1.0 / size as f32;

    for t in 0..frames {
        let offset = t * HOP;
        for (i, slot) in spectrum.iter_mut().enumerate() {
            *slot = Complex::new(padded[offset + i] * window[i], 0.0);
        }
        fft.process(&mut spectrum);

        // Real cepstrum of the log magnitude, liftered and transformed back
        for (slot, bin) in cepstrum.iter_mut().zip(spectrum.iter()) {
            *slot = Complex::new((bin.norm() + 1e-10).ln(), 0.0);
        }
        ifft.process(&mut cepstrum);
        for (q, c) in cepstrum.iter_mut().enumerate() {
            let keep = q < lifter || q > size - lifter;
            *c = if keep { *c * scale } else { Complex::new(0.0, 0.0) };
        }
        fft.process(&mut cepstrum);
        for (k, env) in envelope.iter_mut().enumerate() {
            *env = cepstrum[k].re.exp();
        }

        for k in 0..bins {
            let source = (k as f32 / factor).min(half as f32);
            let i0 = source.floor() as usize;
            let i1 = (i0 + 1).min(half);
            let frac = source - i0 as f32;
            let warped = envelope[i0] + (envelope[i1] - envelope[i0]) * frac;
            let gain = (warped / (envelope[k] + 1e-10)).clamp(MIN_GAIN, MAX_GAIN);
            spectrum[k] *= gain;
        }
        mirror_spectrum(&mut spectrum);
        ifft.process(&mut spectrum);

        for i in 0..size {
            let w = window[i];
            output[offset + i] += spectrum[i].re * scale * w;
            weight[offset + i] += w * w;
        }
    }

    normalize_overlap(&mut output, &weight);
    let mut shifted = output[half..half + input.len()].to_vec();

    let len = shifted.len();
    let edge = EDGE_FADE.min(len / 4);
    for i in 0..edge {
        let mix = i as f32 / edge as f32;
        let tail = len - 1 - i;
        shifted[i] = input[i] + (shifted[i] - input[i]) * mix;
        shifted[tail] = input[tail] + (shifted[tail] - input[tail]) * mix;
    }
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// 200 Hz harmonic tone with a single resonance at `formant_hz`
    fn vowel(formant_hz: f32, sr: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 / sr as f32;
                (1..=40)
                    .map(|h| {
                        let f = 200.0 * h as f32;
                        let amp = (-((f - formant_hz) / 400.0).powi(2)).exp() + 0.01;
                        0.1 * amp * (2.0 * PI * f * t).sin()
                    })
                    .sum()
            })
            .collect()
    }

    fn spectral_centroid(x: &[f32]) -> f32 {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(x.len());
        let mut buf: Vec<Complex<f32>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
        fft.process(&mut buf);
        let half = x.len() / 2;
        let (weighted, total) = buf[..half]
            .iter()
            .enumerate()
            .fold((0.0f64, 0.0f64), |(w, t), (k, c)| {
                let m = c.norm() as f64;
                (w + k as f64 * m, t + m)
            });
        (weighted / total.max(1e-12)) as f32
    }

    #[test]
    fn test_small_shift_is_identity() {
        let input = vowel(800.0, 44100, 4096);
        assert_eq!(shift_formants(&input, 0.05, 44100), input);
        assert_eq!(shift_formants(&input, f32::NAN, 44100), input);
    }

    #[test]
    fn test_length_is_preserved() {
        let input = vowel(800.0, 44100, 5000);
        assert_eq!(shift_formants(&input, 4.0, 44100).len(), 5000);
        assert_eq!(shift_formants(&[0.1; 10], -4.0, 44100).len(), 10);
    }

    #[test]
    fn test_upward_shift_raises_centroid() {
        let input = vowel(800.0, 44100, 16384);
        let output = shift_formants(&input, 12.0, 44100);
        let before = spectral_centroid(&input);
        let after = spectral_centroid(&output);
        assert!(after > before * 1.2, "before {} after {}", before, after);
        assert!(output.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_edges_match_input() {
        let input = vowel(2000.0, 44100, 8192);
        let output = shift_formants(&input, -12.0, 44100);
        assert_eq!(output[0], input[0]);
        assert_eq!(output[8191], input[8191]);
        assert!((output[1] - input[1]).abs() < 0.05);
    }

    #[test]
    fn test_downward_shift_lowers_centroid() {
        let input = vowel(2000.0, 44100, 16384);
        let output = shift_formants(&input, -12.0, 44100);
        assert!(spectral_centroid(&output) < spectral_centroid(&input));
    }
}
