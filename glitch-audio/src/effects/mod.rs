//! Destructive segment effects for glitch
//!
//! Every effect is a small struct holding its clamped parameters. The
//! `Effect` trait turns it into a pure function of
//! `(buffer, segment, sample_rate)`: `process` transforms the extracted
//! segment and the provided `apply` writes or splices the result back.

mod autotune;
mod bitcrusher;
mod buffer_freeze;
mod chorus;
mod datamosh;
mod delay;
mod distortion;
mod filter;
mod granular;
mod hyper;
mod ott;
mod phaser;
mod pitch_shift;
mod ring_mod;
mod saturation;
mod shuffle;
mod stutter;
mod tape_glitch;
mod tape_stop;
mod time_stretch;
mod tremolo;
mod utility;
mod vinyl;
mod vocal_chop;

pub use autotune::Autotune;
pub use bitcrusher::Bitcrusher;
pub use buffer_freeze::BufferFreeze;
pub use chorus::Chorus;
pub use datamosh::Datamosh;
pub use delay::{Delay, NoteDivision};
pub use distortion::{Distortion, DistortionMode};
pub use filter::ResonantFilter;
pub use granular::Granular;
pub use hyper::Hyper;
pub use ott::Ott;
pub use phaser::Phaser;
pub use pitch_shift::{FormantShift, PitchShift, PitchShiftSimple};
pub use ring_mod::RingMod;
pub use saturation::{Saturation, SaturationMode};
pub use shuffle::Shuffle;
pub use stutter::{Stutter, StutterMode};
pub use tape_glitch::TapeGlitch;
pub use tape_stop::TapeStop;
pub use time_stretch::TimeStretch;
pub use tremolo::{LfoShape, Tremolo};
pub use utility::{Pan, Reverse, Volume};
pub use vinyl::Vinyl;
pub use vocal_chop::VocalChop;

use crate::buffer::{AudioBuffer, Segment};
use crate::params::{ParamSet, ParamSpec};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A destructive effect over a segment of a buffer
pub trait Effect: Send {
    /// Registry name, e.g. `"tape_glitch"`
    fn name(&self) -> &'static str;

    /// Declared parameters with ranges and defaults
    fn schema(&self) -> &'static [ParamSpec];

    /// Update parameters present in `params`; absent keys keep their value
    fn configure(&mut self, params: &ParamSet);

    /// Segments shorter than this pass through untouched
    fn min_frames(&self) -> usize {
        1
    }

    /// True if the output segment may differ in length from the input
    fn length_altering(&self) -> bool {
        false
    }

    /// Transform one extracted segment
    fn process(&self, input: &AudioBuffer, sample_rate: u32) -> AudioBuffer;

    /// Apply to `segment` of `buffer` and return the new buffer
    ///
    /// Fixed-length effects return a buffer of the same length in which only
    /// the segment changed; length-altering effects return the spliced
    /// timeline. Degenerate segments return an exact copy of the input.
    fn apply(&self, buffer: &AudioBuffer, segment: Segment, sample_rate: u32) -> AudioBuffer {
        let segment = segment.clamp_to(buffer.frames());
        if segment.is_empty() || segment.len() < self.min_frames().max(1) {
            return buffer.clone();
        }

        let input = buffer.slice(segment);
        let mut processed = self.process(&input, sample_rate);
        processed.clip();

        let output = if self.length_altering() {
            buffer.splice(segment, &processed)
        } else {
            processed.fit_frames(segment.len());
            let channels = buffer.channels().max(processed.channels());
            let mut output = buffer.with_channels(channels);
            output.write_frames(segment.start, &processed);
            output
        };

        tracing::debug!(
            effect = self.name(),
            start = segment.start,
            end = segment.end,
            frames_in = buffer.frames(),
            frames_out = output.frames(),
            "applied effect"
        );
        output
    }
}

/// Convert milliseconds to a frame count at `sample_rate`
#[inline]
pub(crate) fn ms_to_frames(ms: f32, sample_rate: u32) -> usize {
    (ms.max(0.0) * sample_rate as f32 / 1000.0) as usize
}

/// Run `f` over every channel and re-interleave
pub(crate) fn map_channels<F>(input: &AudioBuffer, mut f: F) -> AudioBuffer
where
    F: FnMut(&[f32]) -> Vec<f32>,
{
    let planes: Vec<Vec<f32>> = input.to_planar().iter().map(|ch| f(ch)).collect();
    AudioBuffer::from_planar(&planes)
}

/// Deterministic generator for a signed seed parameter
pub(crate) fn seeded_rng(seed: i64) -> StdRng {
    StdRng::seed_from_u64(seed as u64)
}

/// Concatenate the frame ranges `[start, end)` of `input` in the given order
pub(crate) fn concat_ranges(input: &AudioBuffer, ranges: &[(usize, usize)]) -> AudioBuffer {
    let mut output = AudioBuffer::silence(0, input.channels());
    for &(start, end) in ranges {
        output.extend(&input.slice(Segment::new(start, end)));
    }
    output
}
