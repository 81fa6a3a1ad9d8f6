//! Playback engine - streams the edited buffer to an output device
//!
//! The engine state sits behind a `parking_lot::Mutex` shared with the device
//! callback. The callback only ever `try_lock`s and writes silence when the
//! control side holds the lock, so it never blocks. Swapping in an edited
//! buffer replaces one `Arc` under the lock.

use crate::buffer::{AudioBuffer, Segment};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Output gain applied when nothing else was requested
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Errors from opening the output device
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("No audio output device found")]
    NoDevice,
    #[error("Failed to get audio config: {0}")]
    Config(String),
    #[error("Failed to create audio stream: {0}")]
    Stream(String),
    #[error("Failed to start audio: {0}")]
    Start(String),
}

/// Notifications from the audio side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The end of the buffer was reached without looping
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Transport {
    #[default]
    Stopped,
    Playing,
    Paused,
}

struct PlaybackState {
    buffer: Arc<AudioBuffer>,
    sample_rate: u32,
    /// Next frame to play
    position: usize,
    transport: Transport,
    volume: f32,
    loop_region: Option<Segment>,
}

impl PlaybackState {
    fn new() -> Self {
        Self {
            buffer: Arc::new(AudioBuffer::silence(0, 2)),
            sample_rate: 44100,
            position: 0,
            transport: Transport::Stopped,
            volume: DEFAULT_VOLUME,
            loop_region: None,
        }
    }

    /// Fill an interleaved output block of `channels` channels
    fn render(&mut self, out: &mut [f32], channels: usize, events: &Sender<PlaybackEvent>) {
        out.fill(0.0);
        if self.transport != Transport::Playing || channels == 0 {
            return;
        }

        let buffer = Arc::clone(&self.buffer);
        let src_channels = buffer.channels();
        let samples = buffer.samples();
        let frames = buffer.frames();
        let stop_at = match self.loop_region {
            Some(region) => region.end.min(frames),
            None => frames,
        };

        for frame in out.chunks_exact_mut(channels) {
            if self.position >= stop_at {
                match self.loop_region {
                    Some(region) if region.start < stop_at => self.position = region.start,
                    _ => {
                        self.transport = Transport::Stopped;
                        self.position = frames;
                        let _ = events.try_send(PlaybackEvent::Finished);
                        tracing::debug!("playback finished");
                        return;
                    }
                }
            }

            let src = &samples[self.position * src_channels..(self.position + 1) * src_channels];
            if channels == 1 {
                frame[0] = src.iter().sum::<f32>() / src_channels as f32 * self.volume;
            } else {
                for (c, sample) in frame.iter_mut().enumerate() {
                    *sample = src[c.min(src_channels - 1)] * self.volume;
                }
            }
            self.position += 1;
        }
    }
}

/// Transport-controlled player for one buffer
pub struct PlaybackEngine {
    state: Arc<Mutex<PlaybackState>>,
    events_tx: Sender<PlaybackEvent>,
    events_rx: Receiver<PlaybackEvent>,
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine {
    pub fn new() -> Self {
        let (events_tx, events_rx) = bounded(16);
        Self {
            state: Arc::new(Mutex::new(PlaybackState::new())),
            events_tx,
            events_rx,
        }
    }

    /// Receiver for `PlaybackEvent`s
    pub fn events(&self) -> Receiver<PlaybackEvent> {
        self.events_rx.clone()
    }

    /// Load a new buffer, stopped at the start
    pub fn load(&self, buffer: AudioBuffer, sample_rate: u32) {
        let mut state = self.state.lock();
        state.buffer = Arc::new(buffer);
        state.sample_rate = sample_rate;
        state.position = 0;
        state.transport = Transport::Stopped;
        state.loop_region = None;
    }

    /// Swap in an edited buffer, keeping transport and (clamped) position
    pub fn replace_buffer(&self, buffer: AudioBuffer) {
        let buffer = Arc::new(buffer);
        let mut state = self.state.lock();
        state.position = state.position.min(buffer.frames());
        state.buffer = buffer;
    }

    pub fn play(&self) {
        let mut state = self.state.lock();
        if state.buffer.is_empty() {
            return;
        }
        if state.position >= state.buffer.frames() {
            state.position = 0;
        }
        state.transport = Transport::Playing;
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        if state.transport == Transport::Playing {
            state.transport = Transport::Paused;
        }
    }

    /// Stop and rewind
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.transport = Transport::Stopped;
        state.position = 0;
    }

    /// Move the play head, clamped to the last frame
    pub fn seek(&self, frame: usize) {
        let mut state = self.state.lock();
        let last = state.buffer.frames().saturating_sub(1);
        state.position = frame.min(last);
    }

    /// Loop over `region` while playing; `None` plays through to the end
    pub fn set_loop(&self, region: Option<Segment>) {
        self.state.lock().loop_region = region.filter(|r| !r.is_empty());
    }

    /// Output gain in `[0, 1]`
    pub fn set_volume(&self, volume: f32) {
        self.state.lock().volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_VOLUME
        };
    }

    /// Current play head in frames
    pub fn position(&self) -> usize {
        self.state.lock().position
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().transport == Transport::Playing
    }

    pub fn sample_rate(&self) -> u32 {
        self.state.lock().sample_rate
    }

    /// Pull one interleaved block of `channels` channels
    pub fn render(&self, out: &mut [f32], channels: usize) {
        self.state.lock().render(out, channels, &self.events_tx);
    }

    /// Open the default output device and stream into it
    ///
    /// The stream runs until the returned handle is dropped.
    pub fn start_output(&self) -> Result<cpal::Stream, PlaybackError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(PlaybackError::NoDevice)?;
        let default = device
            .default_output_config()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        let mut config: cpal::StreamConfig = default.into();
        config.sample_rate = cpal::SampleRate(self.sample_rate());
        let channels = config.channels as usize;

        let state = Arc::clone(&self.state);
        let events = self.events_tx.clone();
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Never block the audio thread; silence on contention
                    match state.try_lock() {
                        Some(mut state) => state.render(data, channels, &events),
                        None => data.fill(0.0),
                    }
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| PlaybackError::Stream(e.to_string()))?;

        stream.play().map_err(|e| PlaybackError::Start(e.to_string()))?;
        tracing::info!(
            sample_rate = config.sample_rate.0,
            channels,
            "output stream started"
        );
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> AudioBuffer {
        AudioBuffer::from_mono((0..frames).map(|i| i as f32 * 0.01).collect())
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
        }
    }

    fn loaded(buffer: AudioBuffer) -> PlaybackEngine {
        let engine = PlaybackEngine::new();
        engine.load(buffer, 44100);
        engine.set_volume(1.0);
        engine
    }

    #[test]
    fn test_stopped_engine_renders_silence() {
        let engine = loaded(ramp(16));
        let mut out = [1.0f32; 8];
        engine.render(&mut out, 2);
        assert_eq!(out, [0.0; 8]);
        assert_eq!(engine.position(), 0);
    }

    #[test]
    fn test_mono_source_fills_both_channels() {
        let engine = loaded(ramp(16));
        engine.play();
        let mut out = [0.0f32; 8];
        engine.render(&mut out, 2);
        assert_close(&out, &[0.0, 0.0, 0.01, 0.01, 0.02, 0.02, 0.03, 0.03]);
        assert_eq!(engine.position(), 4);
    }

    #[test]
    fn test_volume_scales_output() {
        let engine = loaded(AudioBuffer::from_mono(vec![0.5; 8]));
        engine.set_volume(0.5);
        engine.play();
        let mut out = [0.0f32; 2];
        engine.render(&mut out, 1);
        assert_eq!(out, [0.25, 0.25]);
        engine.set_volume(7.0);
        engine.render(&mut out, 1);
        assert_eq!(out, [0.5, 0.5]);
    }

    #[test]
    fn test_stereo_source_to_mono_output() {
        let engine = loaded(AudioBuffer::new(vec![0.2, 0.4, 0.6, 0.8], 2));
        engine.play();
        let mut out = [0.0f32; 2];
        engine.render(&mut out, 1);
        assert_close(&out, &[0.3, 0.7]);
    }

    #[test]
    fn test_end_of_buffer_finishes() {
        let engine = loaded(ramp(3));
        let events = engine.events();
        engine.play();
        let mut out = [9.0f32; 5];
        engine.render(&mut out, 1);
        assert_close(&out, &[0.0, 0.01, 0.02, 0.0, 0.0]);
        assert!(!engine.is_playing());
        assert_eq!(events.try_recv(), Ok(PlaybackEvent::Finished));

        // Playing again restarts from the top
        engine.play();
        assert_eq!(engine.position(), 0);
    }

    #[test]
    fn test_loop_region_wraps() {
        let engine = loaded(ramp(10));
        let events = engine.events();
        engine.set_loop(Some(Segment::new(2, 4)));
        engine.seek(2);
        engine.play();
        let mut out = [0.0f32; 6];
        engine.render(&mut out, 1);
        assert_close(&out, &[0.02, 0.03, 0.02, 0.03, 0.02, 0.03]);
        assert!(engine.is_playing());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_pause_keeps_position_and_stop_rewinds() {
        let engine = loaded(ramp(10));
        engine.play();
        let mut out = [0.0f32; 3];
        engine.render(&mut out, 1);
        engine.pause();
        engine.render(&mut out, 1);
        assert_eq!(out, [0.0; 3]);
        assert_eq!(engine.position(), 3);
        engine.stop();
        assert_eq!(engine.position(), 0);
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_seek_and_replace_clamp_position() {
        let engine = loaded(ramp(10));
        engine.seek(100);
        assert_eq!(engine.position(), 9);
        engine.replace_buffer(ramp(4));
        assert_eq!(engine.position(), 4);
        engine.play();
        assert_eq!(engine.position(), 0);
    }

    #[test]
    fn test_empty_buffer_does_not_play() {
        let engine = PlaybackEngine::new();
        engine.play();
        assert!(!engine.is_playing());
    }
}
