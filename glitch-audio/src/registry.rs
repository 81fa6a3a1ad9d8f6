//! Effect lookup by name

use crate::effects::*;

type Constructor = fn() -> Box<dyn Effect>;

/// Every effect, in listing order
const REGISTRY: &[(&str, Constructor)] = &[
    ("autotune", || Box::new(Autotune::new())),
    ("pitch_shift", || Box::new(PitchShift::new())),
    ("pitch_shift_simple", || Box::new(PitchShiftSimple::new())),
    ("formant_shift", || Box::new(FormantShift::new())),
    ("time_stretch", || Box::new(TimeStretch::new())),
    ("tape_stop", || Box::new(TapeStop::new())),
    ("filter", || Box::new(ResonantFilter::new())),
    ("phaser", || Box::new(Phaser::new())),
    ("delay", || Box::new(Delay::new())),
    ("chorus", || Box::new(Chorus::new())),
    ("tremolo", || Box::new(Tremolo::new())),
    ("ring_mod", || Box::new(RingMod::new())),
    ("distortion", || Box::new(Distortion::new())),
    ("saturation", || Box::new(Saturation::new())),
    ("ott", || Box::new(Ott::new())),
    ("bitcrusher", || Box::new(Bitcrusher::new())),
    ("granular", || Box::new(Granular::new())),
    ("buffer_freeze", || Box::new(BufferFreeze::new())),
    ("shuffle", || Box::new(Shuffle::new())),
    ("stutter", || Box::new(Stutter::new())),
    ("datamosh", || Box::new(Datamosh::new())),
    ("vocal_chop", || Box::new(VocalChop::new())),
    ("tape_glitch", || Box::new(TapeGlitch::new())),
    ("vinyl", || Box::new(Vinyl::new())),
    ("hyper", || Box::new(Hyper::new())),
    ("reverse", || Box::new(Reverse::new())),
    ("volume", || Box::new(Volume::new())),
    ("pan", || Box::new(Pan::new())),
];

/// Alternate spellings accepted by `create_effect`
const ALIASES: &[(&str, &str)] = &[("filtre", "filter")];

/// Fold a user-supplied effect name to its registry form
///
/// Lowercases and turns spaces and dashes into underscores, so
/// `"Tape Glitch"` and `"tape-glitch"` both become `"tape_glitch"`.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    match ALIASES.iter().find(|(alias, _)| *alias == folded) {
        Some((_, target)) => target.to_string(),
        None => folded,
    }
}

/// Build an effect with default parameters, or `None` for an unknown name
pub fn create_effect(name: &str) -> Option<Box<dyn Effect>> {
    let wanted = normalize_name(name);
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == wanted)
        .map(|(_, make)| make())
}

/// Registry names of every effect
pub fn effect_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}
