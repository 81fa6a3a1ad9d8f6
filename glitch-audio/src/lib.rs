//! Audio core for glitch - buffers, effects, and playback
//!
//! This crate provides the destructive editing pipeline:
//! - Buffer: Interleaved sample storage and segment ranges
//! - Params: Per-effect parameter schemas with clamping
//! - DSP: Windows, fades, resampling, filters, phase vocoder, formants
//! - Effects: Segment effects from autotune to tape glitch
//! - Chain: Named effect lookup and preset chains
//! - Playback: Output-device streaming of the edited buffer

mod buffer;
mod chain;
mod params;
mod playback;
mod registry;
pub mod dsp;
pub mod effects;

pub use buffer::{AudioBuffer, Segment};
pub use chain::{apply_effect, ChainError, ChainStep, PresetChain};
pub use effects::Effect;
pub use params::{ParamError, ParamKind, ParamSet, ParamSpec, ParamValue};
pub use playback::{PlaybackEngine, PlaybackError, PlaybackEvent};
pub use registry::{create_effect, effect_names, normalize_name};
