//! Shared signal primitives used by the effects
//!
//! - `window` - Hann windows
//! - `fade` - linear micro-fades at edit points
//! - `resample` - FFT and linear resampling, speed-curve reads
//! - `sos` - Butterworth second-order-section filters
//! - `vocoder` - offline phase vocoder time stretch
//! - `formant` - cepstral spectral-envelope shifting

pub mod fade;
pub mod formant;
pub mod resample;
pub mod sos;
pub mod vocoder;
pub mod window;

pub use fade::{fade_frames, fade_in, fade_out, micro_fade, micro_fade_buffer};
pub use formant::shift_formants;
pub use resample::{fft_resample, linear_resample, read_linear, warp_read};
pub use sos::{one_pole_lowpass, Biquad, FilterKind, FilterState, SosFilter};
pub use vocoder::{stretch_to_length, PhaseVocoder};
pub use window::{hann, hann_periodic};

/// Shift pitch by `semitones` without changing duration
///
/// The vocoder stretches by the pitch ratio and a band-limited resample
/// brings the result back to the original length.
pub fn pitch_shift(input: &[f32], semitones: f32) -> Vec<f32> {
    if input.is_empty() || !semitones.is_finite() || semitones == 0.0 {
        return input.to_vec();
    }
    let ratio = 2.0f64.powf(semitones as f64 / 12.0);
    let stretched_len = ((input.len() as f64 * ratio).round() as usize).max(1);
    let stretched = stretch_to_length(input, stretched_len);
    fft_resample(&stretched, input.len())
}
