use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bookcaption_core::shared::constants::{
    DEFAULT_MAX_WORKERS, DEFAULT_MODEL, FFMPEG_PROGRAM, FFPROBE_PROGRAM, SPEED_RATIOS_FILENAME,
    WHISPER_PROGRAM,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one subdirectory per collection.
    pub library_root: PathBuf,
    pub model: String,
    pub speed_ratio_file: PathBuf,
    pub whisper_program: PathBuf,
    /// Arguments placed before whisper's own, e.g. `["-m", "whisper"]`
    /// when `whisper_program` is a Python interpreter.
    pub whisper_args: Vec<String>,
    pub ffmpeg_program: PathBuf,
    pub ffprobe_program: PathBuf,
    pub max_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_root: PathBuf::from("books"),
            model: DEFAULT_MODEL.to_string(),
            speed_ratio_file: PathBuf::from(SPEED_RATIOS_FILENAME),
            whisper_program: PathBuf::from(WHISPER_PROGRAM),
            whisper_args: Vec::new(),
            ffmpeg_program: PathBuf::from(FFMPEG_PROGRAM),
            ffprobe_program: PathBuf::from(FFPROBE_PROGRAM),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("bookcaption").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable settings {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
