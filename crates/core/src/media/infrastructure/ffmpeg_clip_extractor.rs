use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempPath;

use crate::media::domain::clip_extractor::{ClipExtractor, MediaError};
use crate::shared::constants::{CLIP_EXTRACTION_TIMEOUT, FFMPEG_PROGRAM};
use crate::tool::domain::transcription_tool::ToolError;
use crate::tool::infrastructure::child_process::ChildProcess;

/// Cuts the first N seconds of a file with `ffmpeg` stream copy.
pub struct FfmpegClipExtractor {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegClipExtractor {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            timeout: CLIP_EXTRACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfmpegClipExtractor {
    fn default() -> Self {
        Self::new(Path::new(FFMPEG_PROGRAM))
    }
}

impl ClipExtractor for FfmpegClipExtractor {
    fn extract(&self, source: &Path, seconds: u32) -> Result<TempPath, MediaError> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| ".mp3".to_string());
        let clip = tempfile::Builder::new()
            .prefix("speedtest-")
            .suffix(&extension)
            .tempfile()
            .map_err(MediaError::TempFile)?
            .into_temp_path();

        let mut command = Command::new(&self.program);
        command
            .arg("-i")
            .arg(source)
            .args(["-t", &seconds.to_string(), "-acodec", "copy"])
            .arg(&*clip)
            .args(["-y", "-hide_banner", "-loglevel", "error"]);

        let output = ChildProcess::run(command, self.timeout).map_err(|e| match e {
            ToolError::TimedOut(d) => MediaError::TimedOut(d),
            ToolError::Spawn { program, source } => MediaError::Spawn { program, source },
            other => MediaError::Other(other.to_string()),
        });
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                log::error!("Could not create test clip from {}: {e}", source.display());
                return Err(e);
            }
        };

        if !output.success() {
            let stderr = output.stderr_text();
            log::error!("ffmpeg error creating test clip: {stderr}");
            return Err(MediaError::Failed {
                code: output.exit_code,
                stderr,
            });
        }

        let size = fs::metadata(&*clip).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            log::error!("ffmpeg created an empty test clip from {}", source.display());
            return Err(MediaError::Empty(source.display().to_string()));
        }

        Ok(clip)
    }
}
