//! Linear micro-fades for click-free edits

use crate::buffer::AudioBuffer;

/// Gain of step `i` in an `n`-step linear ramp from 0 to 1 (inclusive ends)
#[inline]
fn ramp(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        i as f32 / (n - 1) as f32
    }
}

/// Fade in over the first `n` samples
pub fn fade_in(samples: &mut [f32], n: usize) {
    let n = n.min(samples.len());
    for (i, sample) in samples[..n].iter_mut().enumerate() {
        *sample *= ramp(i, n);
    }
}

/// Fade out over the last `n` samples
pub fn fade_out(samples: &mut [f32], n: usize) {
    let len = samples.len();
    let n = n.min(len);
    for (i, sample) in samples[len - n..].iter_mut().enumerate() {
        *sample *= ramp(n - 1 - i, n);
    }
}

/// Fade both edges of a single-channel run, at most half its length each
pub fn micro_fade(samples: &mut [f32], fade: usize) {
    let n = fade.min(samples.len() / 2);
    if n == 0 {
        return;
    }
    fade_in(samples, n);
    fade_out(samples, n);
}

/// Fade both edges of every channel of an interleaved buffer
pub fn micro_fade_buffer(buffer: &mut AudioBuffer, fade: usize) {
    let frames = buffer.frames();
    let channels = buffer.channels();
    let n = fade.min(frames / 2);
    if n == 0 {
        return;
    }
    let samples = buffer.samples_mut();
    for i in 0..n {
        let gain = ramp(i, n);
        for ch in 0..channels {
            samples[i * channels + ch] *= gain;
            samples[(frames - 1 - i) * channels + ch] *= gain;
        }
    }
}

/// Ramp `n` frames of an interleaved buffer starting at `start`
///
/// `rising` fades in from silence; otherwise the run fades out to silence.
pub fn fade_frames(buffer: &mut AudioBuffer, start: usize, n: usize, rising: bool) {
    let channels = buffer.channels();
    let n = n.min(buffer.frames().saturating_sub(start));
    let samples = buffer.samples_mut();
    for i in 0..n {
        let gain = if rising { ramp(i, n) } else { ramp(n - 1 - i, n) };
        for ch in 0..channels {
            samples[(start + i) * channels + ch] *= gain;
        }
    }
}
