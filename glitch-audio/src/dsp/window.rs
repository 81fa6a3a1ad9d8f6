//! Window functions

use std::f32::consts::PI;

/// Symmetric Hann window (both end points are zero)
///
/// Used where a frame is analysed or synthesized on its own.
pub fn hann(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos())
            .collect(),
    }
}

/// Periodic Hann window
///
/// Overlaps to a constant at hops of n/2 and n/4, which is what STFT
/// resynthesis needs.
pub fn hann_periodic(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}
