//! Interleaved sample buffers and segment ranges

/// An in-memory audio buffer
///
/// Samples are interleaved (`L, R, L, R, ...` for stereo) and nominally in
/// `[-1.0, 1.0]`. The sample rate travels alongside the buffer, not in it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    channels: usize,
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::silence(0, 2)
    }
}

impl AudioBuffer {
    /// Wrap interleaved samples
    ///
    /// Channel count is clamped to 1-2 and a trailing partial frame is dropped.
    pub fn new(mut samples: Vec<f32>, channels: usize) -> Self {
        let channels = channels.clamp(1, 2);
        let whole = samples.len() - samples.len() % channels;
        samples.truncate(whole);
        Self { samples, channels }
    }

    /// A silent buffer of `frames` frames
    pub fn silence(frames: usize, channels: usize) -> Self {
        let channels = channels.clamp(1, 2);
        Self {
            samples: vec![0.0; frames * channels],
            channels,
        }
    }

    /// Build a mono buffer
    pub fn from_mono(samples: Vec<f32>) -> Self {
        Self {
            samples,
            channels: 1,
        }
    }

    /// Interleave planar channel data
    ///
    /// Channels shorter than the longest are zero-padded.
    pub fn from_planar(planes: &[Vec<f32>]) -> Self {
        let channels = planes.len().clamp(1, 2);
        let frames = planes.iter().take(channels).map(Vec::len).max().unwrap_or(0);
        let mut samples = vec![0.0; frames * channels];
        for (ch, plane) in planes.iter().take(channels).enumerate() {
            for (frame, &value) in plane.iter().enumerate() {
                samples[frame * channels + ch] = value;
            }
        }
        Self { samples, channels }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_stereo(&self) -> bool {
        self.channels == 2
    }

    /// Raw interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Split into one vector per channel
    pub fn to_planar(&self) -> Vec<Vec<f32>> {
        (0..self.channels).map(|ch| self.channel(ch)).collect()
    }

    /// Copy out a single channel
    pub fn channel(&self, ch: usize) -> Vec<f32> {
        let ch = ch.min(self.channels - 1);
        self.samples
            .iter()
            .skip(ch)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Average of all channels per frame
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }

    /// Copy of this buffer with `channels` channels
    ///
    /// Mono is duplicated to stereo; stereo is averaged down to mono.
    pub fn with_channels(&self, channels: usize) -> AudioBuffer {
        let channels = channels.clamp(1, 2);
        if channels == self.channels {
            return self.clone();
        }
        if channels == 2 {
            let mono = self.to_mono();
            AudioBuffer::from_planar(&[mono.clone(), mono])
        } else {
            AudioBuffer::from_mono(self.to_mono())
        }
    }

    /// Copy of the frames covered by `segment`
    pub fn slice(&self, segment: Segment) -> AudioBuffer {
        let segment = segment.clamp_to(self.frames());
        AudioBuffer {
            samples: self.samples[segment.start * self.channels..segment.end * self.channels]
                .to_vec(),
            channels: self.channels,
        }
    }

    /// Overwrite frames starting at `start_frame` with `other`
    ///
    /// Frames that would run past the end are dropped. `other` is converted
    /// to this buffer's channel count first.
    pub fn write_frames(&mut self, start_frame: usize, other: &AudioBuffer) {
        let other = other.with_channels(self.channels);
        let start = (start_frame * self.channels).min(self.samples.len());
        let count = other.samples.len().min(self.samples.len() - start);
        self.samples[start..start + count].copy_from_slice(&other.samples[..count]);
    }

    /// New timeline: frames before `segment`, then `replacement`, then frames after
    pub fn splice(&self, segment: Segment, replacement: &AudioBuffer) -> AudioBuffer {
        let segment = segment.clamp_to(self.frames());
        let channels = self.channels.max(replacement.channels);
        let base = self.with_channels(channels);
        let replacement = replacement.with_channels(channels);

        let mut samples = Vec::with_capacity(
            base.samples.len() - segment.len() * channels + replacement.samples.len(),
        );
        samples.extend_from_slice(&base.samples[..segment.start * channels]);
        samples.extend_from_slice(&replacement.samples);
        samples.extend_from_slice(&base.samples[segment.end * channels..]);

        AudioBuffer { samples, channels }
    }

    /// Truncate or zero-pad to exactly `frames` frames
    pub fn fit_frames(&mut self, frames: usize) {
        self.samples.resize(frames * self.channels, 0.0);
    }

    /// Append another buffer (converted to this channel count)
    pub fn extend(&mut self, other: &AudioBuffer) {
        let other = other.with_channels(self.channels);
        self.samples.extend_from_slice(&other.samples);
    }

    /// Zero non-finite samples and clamp everything to `[-1.0, 1.0]`
    pub fn clip(&mut self) {
        for sample in self.samples.iter_mut() {
            *sample = if sample.is_finite() {
                sample.clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Duration in seconds at `sample_rate`
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.frames() as f64 / sample_rate.max(1) as f64
    }
}

/// Half-open frame range `[start, end)` into a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    /// Create a segment, swapping the bounds if given in reverse
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// The whole of `buffer`
    pub fn whole(buffer: &AudioBuffer) -> Self {
        Self::new(0, buffer.frames())
    }

    /// Segment from times in seconds
    pub fn from_secs(start: f64, end: f64, sample_rate: u32) -> Self {
        let to_frame = |t: f64| (t.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(to_frame(start), to_frame(end))
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Clamp both bounds into `0..=frames`
    pub fn clamp_to(self, frames: usize) -> Self {
        Self::new(self.start.min(frames), self.end.min(frames))
    }
}
