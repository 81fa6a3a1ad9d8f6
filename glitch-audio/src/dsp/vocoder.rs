//! Offline phase vocoder for duration changes without pitch change
//!
//! Frames are centered (the signal is zero-padded by half a frame on both
//! sides), analysed at a fractional hop `Ha = Hs · n / m` and resynthesized
//! at hop `Hs`. Each bin's phase advances by its measured instantaneous
//! frequency; the first frame keeps its analysis phase so a stretch by 1.0
//! reproduces the input.

use super::window::hann_periodic;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

const FRAME_SIZE: usize = 2048;
const SYNTHESIS_HOP: usize = 512;

/// Time-stretch `input` to exactly `target_len` samples
pub fn stretch_to_length(input: &[f32], target_len: usize) -> Vec<f32> {
    let n = input.len();
    if target_len == 0 {
        return Vec::new();
    }
    if n == 0 {
        return vec![0.0; target_len];
    }
    if n == target_len {
        return input.to_vec();
    }
    PhaseVocoder::new(FRAME_SIZE, SYNTHESIS_HOP).stretch(input, target_len)
}

/// Reusable vocoder state: FFT plans and window
pub struct PhaseVocoder {
    frame_size: usize,
    hop: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
}

impl PhaseVocoder {
    pub fn new(frame_size: usize, hop: usize) -> Self {
        let frame_size = frame_size.max(16);
        let hop = hop.clamp(1, frame_size);
        let mut planner = FftPlanner::<f32>::new();
        Self {
            frame_size,
            hop,
            window: hann_periodic(frame_size),
            fft: planner.plan_fft_forward(frame_size),
            ifft: planner.plan_fft_inverse(frame_size),
        }
    }

    /// Stretch `input` to `target_len` samples
    pub fn stretch(&self, input: &[f32], target_len: usize) -> Vec<f32> {
        let size = self.frame_size;
        let half = size / 2;
        let bins = half + 1;
        // Compression shrinks the synthesis hop so the analysis hop never
        // exceeds a quarter frame and phase unwrapping stays unambiguous
        let hop = if target_len < input.len() {
            ((self.hop * target_len) as f64 / input.len() as f64).round().max(1.0) as usize
        } else {
            self.hop
        };
        let analysis_hop = hop as f64 * input.len() as f64 / target_len as f64;
        let frames = target_len.div_ceil(hop) + 1;

        let positions: Vec<usize> = (0..frames)
            .map(|t| (t as f64 * analysis_hop).round() as usize)
            .collect();
        let last = positions.last().copied().unwrap_or(0);

        let mut padded = vec![0.0f32; half];
        padded.extend_from_slice(input);
        padded.resize((last + size).max(padded.len()), 0.0);

        let mut output = vec![0.0f32; (frames - 1) * hop + size];
        let mut weight = vec![0.0f32; output.len()];

        let omega: Vec<f64> = (0..bins).map(|k| 2.0 * PI * k as f64 / size as f64).collect();
        let mut prev_phase = vec![0.0f64; bins];
        let mut synth_phase = vec![0.0f64; bins];
        let mut spectrum = vec![Complex::new(0.0f32, 0.0); size];

        for (t, &pos) in positions.iter().enumerate() {
            for (i, slot) in spectrum.iter_mut().enumerate() {
                *slot = Complex::new(padded[pos + i] * self.window[i], 0.0);
            }
            self.fft.process(&mut spectrum);

            let hop_in = if t == 0 { 0 } else { pos - positions[t - 1] };
            for k in 0..bins {
                let phase = spectrum[k].arg() as f64;
                if t == 0 {
                    synth_phase[k] = phase;
                } else if hop_in == 0 {
                    synth_phase[k] += omega[k] * hop as f64;
                } else {
                    let ha = hop_in as f64;
                    let deviation = wrap_phase(phase - prev_phase[k] - omega[k] * ha);
                    let true_freq = omega[k] + deviation / ha;
                    synth_phase[k] = (synth_phase[k] + true_freq * hop as f64).rem_euclid(2.0 * PI);
                }
                prev_phase[k] = phase;
            }

            for k in 0..bins {
                let mag = spectrum[k].norm();
                spectrum[k] = Complex::from_polar(mag, synth_phase[k] as f32);
            }
            mirror_spectrum(&mut spectrum);
            self.ifft.process(&mut spectrum);

            let offset = t * hop;
            let scale = 1.0 / size as f32;
            for i in 0..size {
                let w = self.window[i];
                output[offset + i] += spectrum[i].re * scale * w;
                weight[offset + i] += w * w;
            }
        }

        normalize_overlap(&mut output, &weight);
        output
            .into_iter()
            .skip(half)
            .chain(std::iter::repeat(0.0))
            .take(target_len)
            .collect()
    }
}

/// Fill bins above Nyquist with the conjugate mirror of the lower half
pub(crate) fn mirror_spectrum(spectrum: &mut [Complex<f32>]) {
    let size = spectrum.len();
    for k in 1..size.div_ceil(2) {
        spectrum[size - k] = spectrum[k].conj();
    }
    spectrum[0].im = 0.0;
    if size % 2 == 0 {
        spectrum[size / 2].im = 0.0;
    }
}

/// Divide an overlap-add accumulator by its window-power sum
pub(crate) fn normalize_overlap(output: &mut [f32], weight: &[f32]) {
    for (sample, &w) in output.iter_mut().zip(weight.iter()) {
        *sample = if w > 1e-6 { *sample / w } else { 0.0 };
    }
}

/// Wrap a phase into `[-pi, pi)`
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    (phase + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin())
            .collect()
    }

    fn zero_crossings(x: &[f32]) -> usize {
        x.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count()
    }

    #[test]
    fn test_exact_output_length() {
        let input = sine(440.0, 44100.0, 10000);
        assert_eq!(stretch_to_length(&input, 15000).len(), 15000);
        assert_eq!(stretch_to_length(&input, 3333).len(), 3333);
        assert!(stretch_to_length(&input, 0).is_empty());
        assert_eq!(stretch_to_length(&[], 10), vec![0.0; 10]);
    }

    #[test]
    fn test_unit_stretch_reconstructs() {
        let input = sine(440.0, 44100.0, 8192);
        let vocoder = PhaseVocoder::new(FRAME_SIZE, SYNTHESIS_HOP);
        let out = vocoder.stretch(&input, input.len());
        for (a, b) in input.iter().zip(out.iter()).skip(100).take(7900) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_stretch_preserves_pitch() {
        let input = sine(440.0, 44100.0, 22050);
        let out = stretch_to_length(&input, 44100);
        // Twice as long at the same frequency: about 440 cycles in one second
        let cycles = zero_crossings(&out);
        assert!((cycles as i32 - 440).abs() <= 6, "cycles {}", cycles);
    }

    #[test]
    fn test_compress_preserves_pitch() {
        let input = sine(300.0, 44100.0, 44100);
        let out = stretch_to_length(&input, 22050);
        let cycles = zero_crossings(&out);
        assert!((cycles as i32 - 150).abs() <= 4, "cycles {}", cycles);
    }

    #[test]
    fn test_wrap_phase_range() {
        for p in [-10.0, -PI, 0.0, 3.0, PI, 25.0] {
            let w = wrap_phase(p);
            assert!((-PI..PI).contains(&w));
            assert!(((p - w) / (2.0 * PI) - ((p - w) / (2.0 * PI)).round()).abs() < 1e-9);
        }
    }
}
