//! Named effect application and preset chains

use crate::buffer::{AudioBuffer, Segment};
use crate::effects::Effect;
use crate::params::ParamSet;
use crate::registry::create_effect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from resolving effects by name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Unknown effect '{name}' at step {step}")]
    UnknownEffect { step: usize, name: String },
}

/// One effect with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStep {
    pub effect: String,
    #[serde(default)]
    pub params: ParamSet,
}

impl ChainStep {
    pub fn new(effect: impl Into<String>, params: ParamSet) -> Self {
        Self {
            effect: effect.into(),
            params,
        }
    }
}

/// Effects applied in order to the same segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetChain {
    pub steps: Vec<ChainStep>,
}

impl PresetChain {
    pub fn new(steps: Vec<ChainStep>) -> Self {
        Self { steps }
    }

    /// Builder-style step append
    pub fn then(mut self, effect: impl Into<String>, params: ParamSet) -> Self {
        self.steps.push(ChainStep::new(effect, params));
        self
    }

    /// Configured effects for every step; fails on the first unknown name
    fn resolve(&self) -> Result<Vec<Box<dyn Effect>>, ChainError> {
        self.steps
            .iter()
            .enumerate()
            .map(|(step, s)| {
                let mut effect = create_effect(&s.effect).ok_or_else(|| ChainError::UnknownEffect {
                    step,
                    name: s.effect.clone(),
                })?;
                effect.configure(&s.params);
                Ok(effect)
            })
            .collect()
    }

    /// Apply every step to `segment`
    ///
    /// All names are resolved before any audio is touched. When a step
    /// changes the timeline length the segment end follows it, so the next
    /// step sees exactly the previous step's output.
    pub fn apply(
        &self,
        buffer: &AudioBuffer,
        segment: Segment,
        sample_rate: u32,
    ) -> Result<AudioBuffer, ChainError> {
        let effects = self.resolve()?;
        let mut segment = segment.clamp_to(buffer.frames());
        let mut current = buffer.clone();

        for (step, effect) in effects.iter().enumerate() {
            let tail = current.frames() - segment.end;
            let next = effect.apply(&current, segment, sample_rate);
            segment = Segment::new(segment.start, next.frames().saturating_sub(tail).max(segment.start));
            tracing::debug!(
                step,
                effect = effect.name(),
                start = segment.start,
                end = segment.end,
                "chain step"
            );
            current = next;
        }

        Ok(current)
    }
}

/// Apply one effect by name with the given parameters
pub fn apply_effect(
    buffer: &AudioBuffer,
    segment: Segment,
    name: &str,
    params: &ParamSet,
    sample_rate: u32,
) -> Result<AudioBuffer, ChainError> {
    let mut effect = create_effect(name).ok_or_else(|| ChainError::UnknownEffect {
        step: 0,
        name: name.to_string(),
    })?;
    effect.configure(params);
    Ok(effect.apply(buffer, segment, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: u32 = 44100;

    fn sine(frames: usize) -> AudioBuffer {
        let ch: Vec<f32> = (0..frames)
            .map(|i| 0.5 * (2.0 * PI * 330.0 * i as f32 / SR as f32).sin())
            .collect();
        AudioBuffer::from_planar(&[ch.clone(), ch])
    }

    #[test]
    fn test_apply_effect_by_name() {
        let input = sine(8000);
        let params = ParamSet::new().with("gain_pct", 50.0);
        let output = apply_effect(&input, Segment::new(0, 8000), "Volume", &params, SR).unwrap();
        assert!((output.samples()[100] - input.samples()[100] * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_effect_is_an_error() {
        let input = sine(1000);
        let err = apply_effect(&input, Segment::new(0, 1000), "reverb", &ParamSet::new(), SR)
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::UnknownEffect {
                step: 0,
                name: "reverb".into()
            }
        );
    }

    #[test]
    fn test_unknown_step_leaves_nothing_applied() {
        let chain = PresetChain::default()
            .then("reverse", ParamSet::new())
            .then("not an effect", ParamSet::new());
        let err = chain.apply(&sine(1000), Segment::new(0, 1000), SR).unwrap_err();
        assert!(matches!(err, ChainError::UnknownEffect { step: 1, .. }));
    }

    #[test]
    fn test_segment_follows_length_changes() {
        // Stretch doubles the segment, then reverse must cover the whole stretched part
        let input = sine(10_000);
        let chain = PresetChain::default()
            .then("time_stretch", ParamSet::new().with("factor", 2.0))
            .then("reverse", ParamSet::new());
        let output = chain.apply(&input, Segment::new(2000, 4000), SR).unwrap();
        assert_eq!(output.frames(), 12_000);
        assert_eq!(output.samples()[..4000], input.samples()[..4000]);
        assert_eq!(output.samples()[2 * 6000..], input.samples()[2 * 4000..]);

        let stretched = apply_effect(
            &input,
            Segment::new(2000, 4000),
            "time_stretch",
            &ParamSet::new().with("factor", 2.0),
            SR,
        )
        .unwrap();
        let reversed = apply_effect(&stretched, Segment::new(2000, 6000), "reverse", &ParamSet::new(), SR)
            .unwrap();
        assert_eq!(output, reversed);
    }

    #[test]
    fn test_chain_json_round_trip() {
        let json = r#"{"steps":[{"effect":"stutter","params":{"repeats":8,"stutter_mode":"halving"}},{"effect":"ott"}]}"#;
        let chain: PresetChain = serde_json::from_str(json).unwrap();
        assert_eq!(chain.steps.len(), 2);
        assert_eq!(chain.steps[0].params.len(), 2);
        assert!(chain.steps[1].params.is_empty());
        let output = chain.apply(&sine(20_000), Segment::new(5000, 9000), SR).unwrap();
        assert!(output.frames() > 20_000);
    }
}
