//! Resampling primitives
//!
//! `fft_resample` is band-limited: the spectrum is truncated or zero-padded
//! to the new length and transformed back, splitting or folding the Nyquist
//! bin when the shorter length is even. It changes duration and pitch
//! together; duration-preserving shifts pair it with the phase vocoder.

use rustfft::{num_complex::Complex, FftPlanner};

/// Resample `input` to exactly `len` samples in the frequency domain
pub fn fft_resample(input: &[f32], len: usize) -> Vec<f32> {
    let n = input.len();
    if len == 0 {
        return Vec::new();
    }
    if n == 0 {
        return vec![0.0; len];
    }
    if n == len {
        return input.to_vec();
    }

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(len);

    let mut spectrum: Vec<Complex<f32>> = input.iter().map(|&x| Complex::new(x, 0.0)).collect();
    forward.process(&mut spectrum);

    let shorter = n.min(len);
    let positive = shorter / 2 + 1;
    let negative = shorter - positive;

    let mut resized = vec![Complex::new(0.0f32, 0.0); len];
    resized[..positive].copy_from_slice(&spectrum[..positive]);
    for k in 1..=negative {
        resized[len - k] = spectrum[n - k];
    }

    if shorter % 2 == 0 {
        let half = shorter / 2;
        if len < n {
            // Fold the discarded mirror into the new Nyquist bin
            resized[half] = spectrum[half] + spectrum[n - half];
        } else {
            // Split the old Nyquist bin across both halves
            let split = spectrum[half] * 0.5;
            resized[half] = split;
            resized[len - half] = split;
        }
    }

    inverse.process(&mut resized);

    let scale = 1.0 / n as f32;
    resized.iter().map(|c| c.re * scale).collect()
}

/// Resample by linear interpolation, mapping first and last samples onto each other
pub fn linear_resample(input: &[f32], len: usize) -> Vec<f32> {
    let n = input.len();
    if len == 0 {
        return Vec::new();
    }
    if n == 0 {
        return vec![0.0; len];
    }
    if len == 1 || n == 1 {
        return vec![input[0]; len];
    }

    let step = (n - 1) as f64 / (len - 1) as f64;
    (0..len)
        .map(|i| read_linear(input, (i as f64 * step) as f32))
        .collect()
}

/// Sample `input` at a fractional position; zero outside the signal
#[inline]
pub fn read_linear(input: &[f32], pos: f32) -> f32 {
    if !(pos >= 0.0) {
        return 0.0;
    }
    let i0 = pos.floor() as usize;
    if i0 >= input.len() {
        return 0.0;
    }
    let frac = pos - i0 as f32;
    let a = input[i0];
    let b = if i0 + 1 < input.len() { input[i0 + 1] } else { a };
    a + (b - a) * frac
}

/// Read `input` along the running sum of a playback-speed curve
///
/// The integrated positions are rescaled to span the whole input, so the
/// output has the input's length and only the timing wobbles.
pub fn warp_read(input: &[f32], speed: &[f64]) -> Vec<f32> {
    let n = input.len();
    let mut acc = 0.0f64;
    let cumulative: Vec<f64> = speed
        .iter()
        .map(|s| {
            acc += s;
            acc
        })
        .collect();
    let total = cumulative.last().copied().unwrap_or(1.0).max(f64::EPSILON);
    let span = n.saturating_sub(1) as f64;
    cumulative
        .iter()
        .map(|&c| read_linear(input, (c / total * span) as f32))
        .collect()
}
