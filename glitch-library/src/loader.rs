//! Audio file loading through a cascade of decoding backends
//!
//! Backends are tried in order (native WAV reader, ffmpeg transcode,
//! Symphonia) and the first success wins. Whatever the source layout, the
//! result is a stereo `f32` buffer, optionally resampled to a target rate.

use crate::tools::ffmpeg_path;
use glitch_audio::AudioBuffer;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors that can occur while loading a file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Backend not applicable: {0}")]
    Skipped(&'static str),
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
    #[error("Resample error: {0}")]
    Resample(String),
    #[error("Cannot load '{path}' (install ffmpeg for mp3/m4a/aac): {}", summarize(.errors))]
    AllBackendsFailed {
        path: PathBuf,
        errors: Vec<(Backend, String)>,
    },
}

fn summarize(errors: &[(Backend, String)]) -> String {
    errors
        .iter()
        .map(|(backend, err)| format!("{}: {}", backend, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decoding backends, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Wav,
    Ffmpeg,
    Symphonia,
}

impl Backend {
    pub const ORDER: [Backend; 3] = [Backend::Wav, Backend::Ffmpeg, Backend::Symphonia];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Wav => "wav",
            Backend::Ffmpeg => "ffmpeg",
            Backend::Symphonia => "symphonia",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded file
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    /// Always stereo
    pub buffer: AudioBuffer,
    pub sample_rate: u32,
    /// Backend that produced the audio
    pub backend: Backend,
}

impl LoadedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs(self.sample_rate)
    }
}

/// Interleaved samples straight out of a backend
struct Decoded {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

/// Multi-backend audio file loader
#[derive(Debug, Clone, Default)]
pub struct AudioLoader {
    target_sample_rate: Option<u32>,
}

impl AudioLoader {
    /// Loader that keeps each file's own sample rate
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that resamples everything to `sample_rate`
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            target_sample_rate: Some(sample_rate).filter(|&sr| sr > 0),
        }
    }

    /// Decode `path` with the first backend that succeeds
    pub fn load(&self, path: &Path) -> Result<LoadedAudio, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let mut errors = Vec::new();
        for backend in Backend::ORDER {
            let attempt = match backend {
                Backend::Wav => decode_wav_backend(path),
                Backend::Ffmpeg => decode_ffmpeg(path),
                Backend::Symphonia => decode_symphonia(path),
            };
            match attempt {
                Ok(decoded) => {
                    tracing::info!(
                        path = %path.display(),
                        backend = backend.name(),
                        sample_rate = decoded.sample_rate,
                        channels = decoded.channels,
                        "loaded audio"
                    );
                    return self.finish(decoded, backend);
                }
                Err(LoadError::Skipped(reason)) => {
                    tracing::debug!(backend = backend.name(), reason, "backend skipped");
                    errors.push((backend, reason.to_string()));
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "backend failed");
                    errors.push((backend, e.to_string()));
                }
            }
        }

        Err(LoadError::AllBackendsFailed {
            path: path.to_path_buf(),
            errors,
        })
    }

    /// Force stereo and resample if asked
    fn finish(&self, decoded: Decoded, backend: Backend) -> Result<LoadedAudio, LoadError> {
        let buffer = to_stereo(decoded.samples, decoded.channels);
        match self.target_sample_rate {
            Some(target) if target != decoded.sample_rate => Ok(LoadedAudio {
                buffer: resample(&buffer, decoded.sample_rate, target)?,
                sample_rate: target,
                backend,
            }),
            _ => Ok(LoadedAudio {
                buffer,
                sample_rate: decoded.sample_rate,
                backend,
            }),
        }
    }
}

/// Keep the first two channels; mono is duplicated
fn to_stereo(samples: Vec<f32>, channels: usize) -> AudioBuffer {
    let channels = channels.max(1);
    let buffer = if channels <= 2 {
        AudioBuffer::new(samples, channels)
    } else {
        let front: Vec<f32> = samples
            .chunks_exact(channels)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect();
        AudioBuffer::new(front, 2)
    };
    buffer.with_channels(2)
}

fn decode_wav_backend(path: &Path) -> Result<Decoded, LoadError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return Err(LoadError::Skipped("not a .wav file"));
    }
    decode_wav(path)
}

/// Read a WAV file with hound, normalizing integer PCM to [-1, 1]
fn decode_wav(path: &Path) -> Result<Decoded, LoadError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(Decoded {
        samples,
        channels: spec.channels as usize,
        sample_rate: spec.sample_rate,
    })
}

/// Path for an intermediate file in the system temp directory
pub(crate) fn temp_wav_path(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("glitch-{}-{}-{}.wav", tag, std::process::id(), nanos))
}

/// Run ffmpeg with `args`, mapping a non-zero exit to its stderr
pub(crate) fn run_ffmpeg(ffmpeg: &Path, args: &[&OsStr]) -> Result<(), String> {
    let output = Command::new(ffmpeg)
        .args(["-y", "-loglevel", "error"])
        .args(args)
        .output()
        .map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// Transcode to 16-bit stereo WAV with ffmpeg, then read that
fn decode_ffmpeg(path: &Path) -> Result<Decoded, LoadError> {
    let ffmpeg = ffmpeg_path().ok_or(LoadError::Skipped("ffmpeg not found"))?;
    let tmp = temp_wav_path("decode");
    let result = run_ffmpeg(
        &ffmpeg,
        &[
            OsStr::new("-i"),
            path.as_os_str(),
            OsStr::new("-acodec"),
            OsStr::new("pcm_s16le"),
            OsStr::new("-ac"),
            OsStr::new("2"),
            tmp.as_os_str(),
        ],
    )
    .map_err(LoadError::Ffmpeg)
    .and_then(|()| decode_wav(&tmp));
    let _ = std::fs::remove_file(&tmp);
    result
}

fn decode_symphonia(path: &Path) -> Result<Decoded, LoadError> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| LoadError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(LoadError::NoAudioTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::Decode(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                tracing::debug!(error = %e, "stopping at packet error");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        // Corrupt packets are skipped, the rest of the stream still decodes
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(error = e, "skipping bad packet");
                continue;
            }
            Err(e) => return Err(LoadError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        return Err(LoadError::Decode("no samples decoded".into()));
    }

    Ok(Decoded {
        samples,
        channels,
        sample_rate,
    })
}

/// Band-limited sample rate conversion of every channel
pub(crate) fn resample(buffer: &AudioBuffer, from: u32, to: u32) -> Result<AudioBuffer, LoadError> {
    use rubato::{FftFixedIn, Resampler};

    let planes = buffer.to_planar();
    let frames = buffer.frames();
    let expected = (frames as u64 * to as u64 / from.max(1) as u64) as usize;
    if expected == 0 || from == 0 {
        return Ok(AudioBuffer::silence(0, buffer.channels()));
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, 1024, 2, planes.len())
        .map_err(|e| LoadError::Resample(e.to_string()))?;
    let delay = resampler.output_delay();

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay + 2048); planes.len()];
    let mut pos = 0;
    // Feed zero-padded chunks until the delayed output covers the whole input
    while output[0].len() < delay + expected {
        let needed = resampler.input_frames_next();
        let chunk: Vec<Vec<f32>> = planes
            .iter()
            .map(|plane| {
                let start = pos.min(frames);
                let end = (pos + needed).min(frames);
                let mut part = plane[start..end].to_vec();
                part.resize(needed, 0.0);
                part
            })
            .collect();
        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        for (out, data) in output.iter_mut().zip(resampled) {
            out.extend(data);
        }
        pos += needed;
    }

    let planes: Vec<Vec<f32>> = output
        .into_iter()
        .map(|plane| plane[delay..delay + expected].to_vec())
        .collect();
    Ok(AudioBuffer::from_planar(&planes))
}
