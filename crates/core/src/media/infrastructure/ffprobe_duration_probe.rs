use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::media::domain::duration_probe::DurationProbe;
use crate::shared::constants::{DURATION_PROBE_TIMEOUT, FFPROBE_PROGRAM, SECONDS_PER_MEGABYTE};
use crate::tool::infrastructure::child_process::ChildProcess;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Reads durations with `ffprobe`, falling back to a file-size estimate.
///
/// Results are memoized per path for the lifetime of the probe.
pub struct FfprobeDurationProbe {
    program: PathBuf,
    timeout: Duration,
    cache: Mutex<HashMap<PathBuf, f64>>,
}

impl FfprobeDurationProbe {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            timeout: DURATION_PROBE_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn probe(&self, path: &Path) -> Option<f64> {
        let mut command = Command::new(&self.program);
        command
            .args(["-v", "quiet", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path);

        match ChildProcess::run(command, self.timeout) {
            Ok(output) if output.success() => {
                let parsed = parse_duration(&output.stdout.join("\n"));
                if parsed.is_none() {
                    log::warn!("ffprobe gave no duration for {}", path.display());
                }
                parsed
            }
            Ok(output) => {
                log::warn!(
                    "ffprobe failed for {} with exit code {}",
                    path.display(),
                    output.exit_code
                );
                None
            }
            Err(e) => {
                log::warn!("ffprobe failed for {}: {e}", path.display());
                None
            }
        }
    }
}

impl Default for FfprobeDurationProbe {
    fn default() -> Self {
        Self::new(Path::new(FFPROBE_PROGRAM))
    }
}

impl DurationProbe for FfprobeDurationProbe {
    fn duration(&self, path: &Path) -> f64 {
        if let Some(&cached) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return cached;
        }

        let duration = match self.probe(path) {
            Some(seconds) => seconds,
            None => match estimate_from_size(path) {
                Some(estimate) => {
                    log::info!(
                        "Estimating duration for {} by size: {estimate:.2}s",
                        path.display()
                    );
                    estimate
                }
                None => return 0.0,
            },
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), duration);
        duration
    }
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}

/// Estimate from file size: one megabyte is taken as [`SECONDS_PER_MEGABYTE`].
pub fn estimate_from_size(path: &Path) -> Option<f64> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.len() as f64 / BYTES_PER_MEGABYTE * SECONDS_PER_MEGABYTE),
        Err(e) => {
            log::error!(
                "Could not estimate duration by file size for {}: {e}",
                path.display()
            );
            None
        }
    }
}
