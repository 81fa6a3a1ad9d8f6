//! Writing edited audio back to disk
//!
//! WAV is written directly as 16-bit PCM. Compressed formats are produced by
//! writing a temporary WAV and handing it to ffmpeg.

use crate::loader::{run_ffmpeg, temp_wav_path};
use crate::tools::ffmpeg_path;
use glitch_audio::AudioBuffer;
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("{0} export needs ffmpeg, which was not found")]
    FfmpegMissing(ExportFormat),
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
}

/// Output container and codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Wav,
        ExportFormat::Mp3,
        ExportFormat::Flac,
        ExportFormat::Ogg,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Wav => "wav",
            ExportFormat::Mp3 => "mp3",
            ExportFormat::Flac => "flac",
            ExportFormat::Ogg => "ogg",
        }
    }

    /// ffmpeg encoder name; `None` for the native WAV path
    pub fn codec(self) -> Option<&'static str> {
        match self {
            ExportFormat::Wav => None,
            ExportFormat::Mp3 => Some("libmp3lame"),
            ExportFormat::Flac => Some("flac"),
            ExportFormat::Ogg => Some("libvorbis"),
        }
    }

    /// Format implied by a file name's extension
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        ext.parse()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ExportError::UnsupportedFormat(s.to_string()))
    }
}

/// Write `buffer` as 16-bit PCM WAV
pub fn export_wav(buffer: &AudioBuffer, sample_rate: u32, path: &Path) -> Result<(), ExportError> {
    let spec = hound::WavSpec {
        channels: buffer.channels() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in buffer.samples() {
        let clamped = if sample.is_finite() { sample.clamp(-1.0, 1.0) } else { 0.0 };
        writer.write_sample((clamped * i16::MAX as f32).round() as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write `buffer` to `path` in `format`
pub fn export_audio(
    buffer: &AudioBuffer,
    sample_rate: u32,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let Some(codec) = format.codec() else {
        export_wav(buffer, sample_rate, path)?;
        tracing::info!(path = %path.display(), format = %format, "exported");
        return Ok(());
    };

    let ffmpeg = ffmpeg_path().ok_or(ExportError::FfmpegMissing(format))?;
    let tmp = temp_wav_path("export");
    export_wav(buffer, sample_rate, &tmp)?;
    let result = run_ffmpeg(
        &ffmpeg,
        &[
            OsStr::new("-i"),
            tmp.as_os_str(),
            OsStr::new("-acodec"),
            OsStr::new(codec),
            path.as_os_str(),
        ],
    )
    .map_err(ExportError::Ffmpeg);
    let _ = std::fs::remove_file(&tmp);
    result?;

    tracing::info!(path = %path.display(), format = %format, "exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::AudioLoader;

    #[test]
    fn test_format_parsing() {
        assert_eq!("mp3".parse::<ExportFormat>().unwrap(), ExportFormat::Mp3);
        assert_eq!(".FLAC".parse::<ExportFormat>().unwrap(), ExportFormat::Flac);
        assert!("aiff".parse::<ExportFormat>().is_err());
        assert_eq!(
            ExportFormat::from_path(Path::new("out/take.ogg")).unwrap(),
            ExportFormat::Ogg
        );
        assert_eq!(ExportFormat::Ogg.codec(), Some("libvorbis"));
    }

    #[test]
    fn test_wav_round_trip() {
        let buffer = AudioBuffer::new(vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25], 2);
        let path = temp_wav_path("test-export");
        export_audio(&buffer, 48000, &path, ExportFormat::Wav).unwrap();
        let loaded = AudioLoader::new().load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.sample_rate, 48000);
        assert_eq!(loaded.buffer.frames(), 3);
        for (a, b) in loaded.buffer.samples().iter().zip(buffer.samples()) {
            assert!((a - b).abs() < 1.0 / 16_000.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        let buffer = AudioBuffer::from_mono(vec![3.0, -3.0, f32::NAN]);
        let path = temp_wav_path("test-clamp");
        export_wav(&buffer, 44100, &path).unwrap();
        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX, 0]);
    }
}
