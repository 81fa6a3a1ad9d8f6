//! Named effect chains stored as JSON
//!
//! A store file that does not exist yet yields the built-in defaults, so a
//! fresh install has something to apply straight away.

use glitch_audio::{ParamSet, PresetChain};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from reading or writing the preset store
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid preset file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No preset named '{0}'")]
    NotFound(String),
}

/// A named, tagged effect chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub chain: PresetChain,
}

impl Preset {
    pub fn new(name: impl Into<String>, description: impl Into<String>, chain: PresetChain) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            chain,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    presets: Vec<Preset>,
}

/// Preset collection backed by a JSON file
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    path: Option<PathBuf>,
    presets: Vec<Preset>,
}

impl PresetStore {
    /// In-memory store holding the built-in presets
    pub fn with_defaults() -> Self {
        Self {
            path: None,
            presets: default_presets(),
        }
    }

    /// Open the store at `path`; a missing file gives the defaults
    pub fn open(path: &Path) -> Result<Self, PresetError> {
        let presets = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<PresetFile>(&content)?.presets,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no preset file, using defaults");
                default_presets()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            presets,
        })
    }

    /// Write the store back to the file it was opened from
    pub fn save(&self) -> Result<(), PresetError> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PresetError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = PresetFile {
            presets: self.presets.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        tracing::info!(path = %path.display(), count = self.presets.len(), "saved presets");
        Ok(())
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Look up a preset by name, ignoring case
    pub fn get(&self, name: &str) -> Result<&Preset, PresetError> {
        let wanted = name.trim();
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PresetError::NotFound(name.to_string()))
    }

    /// Insert a preset, replacing any with the same name
    pub fn add(&mut self, preset: Preset) {
        match self
            .presets
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&preset.name))
        {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    pub fn remove(&mut self, name: &str) -> Result<Preset, PresetError> {
        let index = self
            .presets
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;
        Ok(self.presets.remove(index))
    }

    /// Every tag in use, sorted and deduplicated
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .presets
            .iter()
            .flat_map(|p| p.tags.iter().map(|t| t.to_lowercase()))
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Preset> + 'a {
        self.presets.iter().filter(move |p| p.has_tag(tag))
    }
}

fn default_presets() -> Vec<Preset> {
    vec![
        Preset::new(
            "Hyperpop Vocal",
            "Hard-tuned vocal pushed through the hyper chain",
            PresetChain::default()
                .then("autotune", ParamSet::new().with("hard_tune", true))
                .then("hyper", ParamSet::new().with("intensity", 0.6).with("shimmer", 0.4)),
        )
        .with_tags(&["hyperpop", "vocal"]),
        Preset::new(
            "Lo-Fi Tape",
            "Worn tape and vinyl with the top end rolled off",
            PresetChain::default()
                .then("tape_glitch", ParamSet::new().with("glitch_rate", 0.2))
                .then("vinyl", ParamSet::new().with("crackle", 0.4))
                .then(
                    "filter",
                    ParamSet::new()
                        .with("filter_type", "lowpass")
                        .with("cutoff_hz", 4000.0),
                ),
        )
        .with_tags(&["lofi", "tape"]),
        Preset::new(
            "Stutter Build",
            "Halving stutter with a fading tail",
            PresetChain::default().then(
                "stutter",
                ParamSet::new()
                    .with("repeats", 8)
                    .with("stutter_mode", "halving")
                    .with("decay", 0.2),
            ),
        )
        .with_tags(&["glitch", "transition"]),
        Preset::new(
            "Datamosh Chaos",
            "Block swaps followed by a slice shuffle",
            PresetChain::default()
                .then("datamosh", ParamSet::new().with("chaos", 0.8))
                .then("shuffle", ParamSet::new().with("num_slices", 16)),
        )
        .with_tags(&["glitch"]),
        Preset::new(
            "Vocal Chops",
            "Gated glitch pattern with reversed hits",
            PresetChain::default().then(
                "vocal_chop",
                ParamSet::new()
                    .with("pattern", "glitch")
                    .with("reverse_hits", true),
            ),
        )
        .with_tags(&["vocal", "rhythm"]),
        Preset::new(
            "Crushed",
            "Low bit depth into hard saturation",
            PresetChain::default()
                .then("bitcrusher", ParamSet::new().with("bit_depth", 6).with("downsample", 4))
                .then("saturation", ParamSet::new().with("mode", "hard")),
        )
        .with_tags(&["lofi", "distortion"]),
        Preset::new(
            "Tape Stop Out",
            "Power-down ending",
            PresetChain::default().then("tape_stop", ParamSet::new().with("duration_ms", 1200.0)),
        )
        .with_tags(&["transition", "tape"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glitch_audio::{AudioBuffer, Segment};

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("glitch-presets-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_defaults_apply_cleanly() {
        let store = PresetStore::with_defaults();
        let buffer = AudioBuffer::from_planar(&[
            (0..44_100).map(|i| (i as f32 * 0.05).sin() * 0.5).collect(),
            (0..44_100).map(|i| (i as f32 * 0.03).sin() * 0.5).collect(),
        ]);
        for preset in store.presets() {
            let output = preset
                .chain
                .apply(&buffer, Segment::new(4410, 30_000), 44100)
                .unwrap_or_else(|e| panic!("{}: {}", preset.name, e));
            assert!(output.peak() <= 1.0, "{}", preset.name);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let store = PresetStore::open(&temp_path("missing")).unwrap();
        assert_eq!(store.presets().len(), default_presets().len());
    }

    #[test]
    fn test_save_and_reopen() {
        let path = temp_path("roundtrip");
        let mut store = PresetStore::open(&path).unwrap();
        store.add(
            Preset::new(
                "Mine",
                "custom",
                PresetChain::default().then("reverse", ParamSet::new()),
            )
            .with_tags(&["Custom"]),
        );
        store.remove("crushed").unwrap();
        store.save().unwrap();

        let reopened = PresetStore::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(reopened.presets(), store.presets());
        assert!(reopened.get("MINE").is_ok());
        assert!(matches!(reopened.get("Crushed"), Err(PresetError::NotFound(_))));
        assert!(reopened.tags().contains(&"custom".to_string()));
    }

    #[test]
    fn test_add_replaces_same_name() {
        let mut store = PresetStore::with_defaults();
        let count = store.presets().len();
        store.add(Preset::new("lo-fi tape", "replaced", PresetChain::default()));
        assert_eq!(store.presets().len(), count);
        assert_eq!(store.get("Lo-Fi Tape").unwrap().description, "replaced");
    }

    #[test]
    fn test_json_layout() {
        let json = r#"{"presets":[{"name":"Wide","steps":[{"effect":"pan","params":{"pan":0.5}}]}]}"#;
        let file: PresetFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.presets[0].chain.steps[0].effect, "pan");
        assert!(file.presets[0].tags.is_empty());
    }

    #[test]
    fn test_by_tag() {
        let store = PresetStore::with_defaults();
        let lofi: Vec<&str> = store.by_tag("LOFI").map(|p| p.name.as_str()).collect();
        assert_eq!(lofi, vec!["Lo-Fi Tape", "Crushed"]);
    }
}
