//! Simple configuration persistence for glitch
//!
//! Stores tool locations and user preferences in a `key=value` text file.

use crate::export::ExportFormat;
use crate::tools::set_ffmpeg_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Explicit ffmpeg executable; otherwise `PATH` is searched
    pub ffmpeg_path: Option<PathBuf>,
    /// Resample loaded files to this rate
    pub target_sample_rate: Option<u32>,
    /// Directory holding `presets.json`
    pub preset_dir: Option<PathBuf>,
    pub export_format: ExportFormat,
    pub last_open_folder: Option<PathBuf>,
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn save(&self) -> io::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    /// Default config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.txt")
    }

    /// Directory for glitch's config, presets included
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glitch")
    }

    /// Where the preset store lives
    pub fn preset_path(&self) -> PathBuf {
        self.preset_dir
            .clone()
            .unwrap_or_else(Self::config_dir)
            .join("presets.json")
    }

    /// Push process-wide settings (the ffmpeg location) into effect
    pub fn apply(&self) {
        if let Some(path) = &self.ffmpeg_path {
            set_ffmpeg_path(Some(path.clone()));
        }
    }

    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim() {
                "ffmpeg_path" => config.ffmpeg_path = Some(PathBuf::from(value)),
                "target_sample_rate" => match value.parse::<u32>() {
                    Ok(sr) if sr > 0 => config.target_sample_rate = Some(sr),
                    _ => tracing::warn!(value, "ignoring bad target_sample_rate"),
                },
                "preset_dir" => config.preset_dir = Some(PathBuf::from(value)),
                "export_format" => match value.parse() {
                    Ok(format) => config.export_format = format,
                    Err(_) => tracing::warn!(value, "ignoring bad export_format"),
                },
                "last_open_folder" => config.last_open_folder = Some(PathBuf::from(value)),
                other => tracing::debug!(key = other, "unknown config key"),
            }
        }

        config
    }

    fn serialize(&self) -> String {
        let mut lines = vec!["# glitch configuration".to_string()];

        if let Some(path) = &self.ffmpeg_path {
            lines.push(format!("ffmpeg_path={}", path.display()));
        }
        if let Some(sr) = self.target_sample_rate {
            lines.push(format!("target_sample_rate={}", sr));
        }
        if let Some(dir) = &self.preset_dir {
            lines.push(format!("preset_dir={}", dir.display()));
        }
        lines.push(format!("export_format={}", self.export_format));
        if let Some(folder) = &self.last_open_folder {
            lines.push(format!("last_open_folder={}", folder.display()));
        }

        lines.join("\n")
    }
}
