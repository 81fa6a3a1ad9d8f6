//! File I/O for glitch - decoding, export, presets and configuration

mod config;
mod export;
mod loader;
mod presets;
mod tools;

pub use config::Config;
pub use export::{export_audio, export_wav, ExportError, ExportFormat};
pub use loader::{AudioLoader, Backend, LoadError, LoadedAudio};
pub use presets::{Preset, PresetError, PresetStore};
pub use tools::{ffmpeg_path, find_in_path, set_ffmpeg_path};
