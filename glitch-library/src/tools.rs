//! External tool discovery
//!
//! The ffmpeg location is a process-wide setting. A path set explicitly
//! (usually from the config file) wins; otherwise the first lookup scans
//! `PATH` once and caches the answer, found or not.

use parking_lot::RwLock;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Default)]
struct Tools {
    ffmpeg: Option<PathBuf>,
    resolved: bool,
}

static TOOLS: OnceLock<RwLock<Tools>> = OnceLock::new();

fn tools() -> &'static RwLock<Tools> {
    TOOLS.get_or_init(|| RwLock::new(Tools::default()))
}

/// Location of the ffmpeg executable, if any
pub fn ffmpeg_path() -> Option<PathBuf> {
    {
        let tools = tools().read();
        if tools.resolved {
            return tools.ffmpeg.clone();
        }
    }

    let mut tools = tools().write();
    if !tools.resolved {
        tools.ffmpeg = find_in_path("ffmpeg");
        tools.resolved = true;
        match &tools.ffmpeg {
            Some(path) => tracing::info!(path = %path.display(), "found ffmpeg"),
            None => tracing::info!("ffmpeg not found in PATH"),
        }
    }
    tools.ffmpeg.clone()
}

/// Override the ffmpeg location; `None` disables the ffmpeg backends
pub fn set_ffmpeg_path(path: Option<PathBuf>) {
    let mut tools = tools().write();
    tools.ffmpeg = path;
    tools.resolved = true;
}

/// Search the directories of `PATH` for an executable file called `name`
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| candidate(&dir, name))
}

fn candidate(dir: &Path, name: &str) -> Option<PathBuf> {
    let plain = dir.join(name);
    if plain.is_file() {
        return Some(plain);
    }
    if cfg!(windows) {
        let exe = dir.join(format!("{}.exe", name));
        if exe.is_file() {
            return Some(exe);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_candidate_finds_file_in_dir() {
        let dir = env::temp_dir().join(format!("glitch-tools-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("fake-tool"), b"").unwrap();

        assert_eq!(candidate(&dir, "fake-tool"), Some(dir.join("fake-tool")));
        assert_eq!(candidate(&dir, "missing-tool"), None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/opt/ffmpeg/bin/ffmpeg");
        set_ffmpeg_path(Some(path.clone()));
        assert_eq!(ffmpeg_path(), Some(path));
    }
}
