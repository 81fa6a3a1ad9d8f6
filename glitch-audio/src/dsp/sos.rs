//! Butterworth filters as cascaded second-order sections
//!
//! Designs use the bilinear transform with frequency prewarping. An order-N
//! filter is N/2 biquads with the Butterworth pole Qs, plus one first-order
//! section when N is odd. Each section runs in transposed direct form II
//! with `f64` state.

use std::f64::consts::PI;

/// Low-pass or high-pass response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FilterKind {
    #[default]
    Lowpass,
    Highpass,
}

/// One section: `b0 + b1 z^-1 + b2 z^-2` over `1 + a1 z^-1 + a2 z^-2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 2],
}

impl Biquad {
    /// Second-order Butterworth stage with prewarped `k = tan(pi * fc / fs)`
    fn second_order(kind: FilterKind, k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let a = [2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm];
        let b = match kind {
            FilterKind::Lowpass => [k2 * norm, 2.0 * k2 * norm, k2 * norm],
            FilterKind::Highpass => [norm, -2.0 * norm, norm],
        };
        Self { b, a }
    }

    /// First-order stage, used for the odd pole
    fn first_order(kind: FilterKind, k: f64) -> Self {
        let a1 = (k - 1.0) / (k + 1.0);
        let b = match kind {
            FilterKind::Lowpass => {
                let b0 = k / (k + 1.0);
                [b0, b0, 0.0]
            }
            FilterKind::Highpass => {
                let b0 = 1.0 / (k + 1.0);
                [b0, -b0, 0.0]
            }
        };
        Self { b, a: [a1, 0.0] }
    }

    /// Run one sample through the section
    #[inline]
    fn tick(&self, x: f64, z: &mut [f64; 2]) -> f64 {
        let y = self.b[0] * x + z[0];
        z[0] = self.b[1] * x - self.a[0] * y + z[1];
        z[1] = self.b[2] * x - self.a[1] * y;
        y
    }
}

/// A cascade of biquad sections
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<Biquad>,
}

impl SosFilter {
    /// Design a Butterworth low/high-pass of `order` (1-16)
    ///
    /// The cutoff is normalized to Nyquist and clamped into (0.001, 0.999)
    /// so out-of-range requests still give a stable filter.
    pub fn butterworth(kind: FilterKind, order: usize, cutoff_hz: f32, sample_rate: u32) -> Self {
        let order = order.clamp(1, 16);
        let nyquist = sample_rate.max(1) as f64 / 2.0;
        let normalized = (cutoff_hz as f64 / nyquist).clamp(0.001, 0.999);
        let k = (PI * normalized / 2.0).tan();

        let mut sections = Vec::with_capacity(order / 2 + 1);
        for i in 1..=order / 2 {
            let theta = (2 * i - 1) as f64 * PI / (2 * order) as f64;
            let q = 1.0 / (2.0 * theta.sin());
            sections.push(Biquad::second_order(kind, k, q));
        }
        if order % 2 == 1 {
            sections.push(Biquad::first_order(kind, k));
        }

        Self { sections }
    }

    /// Band-pass as a high-pass at `low_hz` cascaded with a low-pass at `high_hz`
    pub fn bandpass(order: usize, low_hz: f32, high_hz: f32, sample_rate: u32) -> Self {
        let mut filter = Self::butterworth(FilterKind::Highpass, order, low_hz, sample_rate);
        filter.sections.extend(
            Self::butterworth(FilterKind::Lowpass, order, high_hz, sample_rate).sections,
        );
        filter
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Fresh zero state for one channel
    pub fn zero_state(&self) -> Vec<[f64; 2]> {
        vec![[0.0; 2]; self.sections.len()]
    }

    /// Filter from zero state
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        let mut state = self.zero_state();
        self.process_with_state(input, &mut state)
    }

    /// Filter continuing from (and updating) `state`
    ///
    /// A state of the wrong size is reset to zero first.
    pub fn process_with_state(&self, input: &[f32], state: &mut Vec<[f64; 2]>) -> Vec<f32> {
        if state.len() != self.sections.len() {
            *state = self.zero_state();
        }
        input
            .iter()
            .map(|&x| {
                let mut y = x as f64;
                for (section, z) in self.sections.iter().zip(state.iter_mut()) {
                    y = section.tick(y, z);
                }
                y as f32
            })
            .collect()
    }
}

/// Per-channel delay-line state of an `SosFilter`
///
/// Returned alongside the output of a stateful filter call; passing it back
/// into the next call makes the two calls behave as one continuous stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    channels: Vec<Vec<[f64; 2]>>,
}

impl FilterState {
    /// Zero state for `channels` channels of `filter`
    pub fn zeros(filter: &SosFilter, channels: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| filter.zero_state()).collect(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// True if every stored value is zero
    pub fn is_zero(&self) -> bool {
        self.channels
            .iter()
            .flatten()
            .all(|z| z[0] == 0.0 && z[1] == 0.0)
    }

    /// Mutable state for one channel, growing the channel list if needed
    pub fn channel_mut(&mut self, ch: usize, filter: &SosFilter) -> &mut Vec<[f64; 2]> {
        while self.channels.len() <= ch {
            self.channels.push(filter.zero_state());
        }
        &mut self.channels[ch]
    }
}

/// One-pole low-pass `y[n] = (1 - alpha) x[n] + alpha y[n-1]`
pub fn one_pole_lowpass(input: &[f32], alpha: f32) -> Vec<f32> {
    let alpha = alpha.clamp(0.0, 0.999);
    let mut state = 0.0f32;
    input
        .iter()
        .map(|&x| {
            state = (1.0 - alpha) * x + alpha * state;
            state
        })
        .collect()
}
