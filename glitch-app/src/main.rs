//! glitch - destructive audio effects from the command line

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use glitch_audio::{
    apply_effect, create_effect, effect_names, AudioBuffer, ParamSet, PlaybackEngine,
    PlaybackEvent, Segment,
};
use glitch_library::{export_audio, AudioLoader, Config, ExportFormat, LoadedAudio, PresetStore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// glitch - destructive audio effects for glitch, hyperpop and lo-fi editing
#[derive(Parser, Debug)]
#[command(name = "glitch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Time range of the file to edit, in seconds
#[derive(clap::Args, Debug, Clone, Copy)]
struct Range {
    /// Segment start (default: beginning)
    #[arg(long)]
    start: Option<f64>,

    /// Segment end (default: end of file)
    #[arg(long)]
    end: Option<f64>,
}

impl Range {
    fn segment(&self, audio: &LoadedAudio) -> Segment {
        let end = self.end.unwrap_or_else(|| audio.duration_secs());
        Segment::from_secs(self.start.unwrap_or(0.0), end, audio.sample_rate)
            .clamp_to(audio.buffer.frames())
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List effects and their parameters
    List {
        /// Only show this effect
        effect: Option<String>,
    },
    /// Apply one effect to a file
    Apply {
        input: PathBuf,
        output: PathBuf,
        effect: String,
        /// Parameters as key=value
        params: Vec<String>,
        #[command(flatten)]
        range: Range,
    },
    /// Apply a stored preset chain to a file
    Preset {
        input: PathBuf,
        output: PathBuf,
        preset: String,
        #[command(flatten)]
        range: Range,
    },
    /// List stored presets
    Presets {
        /// Only presets with this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Play a file through the default output device
    Play {
        input: PathBuf,
        /// Loop until interrupted
        #[arg(long = "loop")]
        looping: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load();
    config.apply();

    match args.command {
        Command::List { effect } => list_effects(effect.as_deref()),
        Command::Apply {
            input,
            output,
            effect,
            params,
            range,
        } => {
            let params = ParamSet::from_assignments(&params).context("Bad parameter")?;
            let audio = load(&config, &input)?;
            let segment = range.segment(&audio);
            let edited = apply_effect(&audio.buffer, segment, &effect, &params, audio.sample_rate)?;
            save(&config, &edited, audio.sample_rate, &output)
        }
        Command::Preset {
            input,
            output,
            preset,
            range,
        } => {
            let store = PresetStore::open(&config.preset_path())?;
            let preset = store.get(&preset)?;
            let audio = load(&config, &input)?;
            let segment = range.segment(&audio);
            let edited = preset.chain.apply(&audio.buffer, segment, audio.sample_rate)?;
            save(&config, &edited, audio.sample_rate, &output)
        }
        Command::Presets { tag } => {
            let store = PresetStore::open(&config.preset_path())?;
            for preset in store.presets() {
                if tag.as_deref().is_some_and(|t| !preset.has_tag(t)) {
                    continue;
                }
                let steps: Vec<&str> = preset.chain.steps.iter().map(|s| s.effect.as_str()).collect();
                println!("{:<20} {} [{}]", preset.name, preset.description, steps.join(" > "));
            }
            Ok(())
        }
        Command::Play { input, looping } => play(&config, &input, looping),
    }
}

/// `RUST_LOG` wins; otherwise info, raised by each `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list_effects(only: Option<&str>) -> Result<()> {
    let names: Vec<&str> = match only {
        Some(name) => {
            let effect = create_effect(name).with_context(|| format!("Unknown effect '{}'", name))?;
            vec![effect.name()]
        }
        None => effect_names().collect(),
    };

    for name in names {
        let Some(effect) = create_effect(name) else {
            continue;
        };
        let mut flags = Vec::new();
        if effect.length_altering() {
            flags.push("length-altering".to_string());
        }
        if effect.min_frames() > 1 {
            flags.push(format!("min {} frames", effect.min_frames()));
        }
        if flags.is_empty() {
            println!("{}", name);
        } else {
            println!("{} ({})", name, flags.join(", "));
        }
        for spec in effect.schema() {
            println!("    {}", spec.describe());
        }
    }
    Ok(())
}

fn load(config: &Config, path: &Path) -> Result<LoadedAudio> {
    let loader = match config.target_sample_rate {
        Some(sr) => AudioLoader::with_sample_rate(sr),
        None => AudioLoader::new(),
    };
    loader
        .load(path)
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn save(config: &Config, buffer: &AudioBuffer, sample_rate: u32, path: &Path) -> Result<()> {
    let format = match path.extension() {
        Some(_) => ExportFormat::from_path(path)?,
        None => config.export_format,
    };
    export_audio(buffer, sample_rate, path, format)
        .with_context(|| format!("Failed to export {}", path.display()))?;
    println!(
        "Wrote {} ({:.2}s)",
        path.display(),
        buffer.duration_secs(sample_rate)
    );
    Ok(())
}

fn play(config: &Config, path: &Path, looping: bool) -> Result<()> {
    let audio = load(config, path)?;
    if audio.buffer.is_empty() {
        bail!("{} contains no audio", path.display());
    }

    let engine = PlaybackEngine::new();
    let events = engine.events();
    let whole = Segment::whole(&audio.buffer);
    engine.load(audio.buffer, audio.sample_rate);
    if looping {
        engine.set_loop(Some(whole));
    }

    let _stream = engine.start_output()?;
    engine.play();
    println!("Playing {} (Ctrl-C to stop)", path.display());

    loop {
        match events.recv_timeout(Duration::from_millis(250)) {
            Ok(PlaybackEvent::Finished) => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glitch_library::Backend;

    #[test]
    fn test_parse_apply_command() {
        let args = Args::try_parse_from([
            "glitch", "apply", "in.wav", "out.mp3", "stutter", "repeats=8", "stutter_mode=halving",
            "--start", "1.5", "--end", "2",
        ])
        .unwrap();
        match args.command {
            Command::Apply {
                effect,
                params,
                range,
                ..
            } => {
                assert_eq!(effect, "stutter");
                assert_eq!(params, vec!["repeats=8", "stutter_mode=halving"]);
                assert_eq!(range.start, Some(1.5));
                assert_eq!(range.end, Some(2.0));
            }
            other => panic!("parsed {:?}", other),
        }
    }

    #[test]
    fn test_range_defaults_to_whole_file() {
        let audio = LoadedAudio {
            buffer: AudioBuffer::silence(44100, 2),
            sample_rate: 44100,
            backend: Backend::Wav,
        };
        let range = Range {
            start: None,
            end: None,
        };
        assert_eq!(range.segment(&audio), Segment::new(0, 44100));

        let past_end = Range {
            start: Some(0.5),
            end: Some(9.0),
        };
        assert_eq!(past_end.segment(&audio), Segment::new(22050, 44100));
    }

    #[test]
    fn test_verbose_is_global() {
        let args = Args::try_parse_from(["glitch", "list", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }
}
