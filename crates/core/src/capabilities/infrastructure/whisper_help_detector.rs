use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::capabilities::domain::capability_detector::CapabilityDetector;
use crate::capabilities::domain::tool_capabilities::ToolCapabilities;
use crate::shared::constants::CAPABILITY_PROBE_TIMEOUT;
use crate::tool::domain::transcription_tool::{ToolError, ToolOutput};
use crate::tool::infrastructure::child_process::ChildProcess;

/// Detects capabilities by scanning `<program> --help` for feature flags.
pub struct WhisperHelpDetector {
    program: PathBuf,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl WhisperHelpDetector {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            leading_args: Vec::new(),
            timeout: CAPABILITY_PROBE_TIMEOUT,
        }
    }

    /// Arguments placed before `--help`, e.g. `["-m", "whisper"]` when the
    /// program is a Python interpreter.
    pub fn with_leading_args(mut self, args: &[String]) -> Self {
        self.leading_args = args.to_vec();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn help_output(&self) -> Result<ToolOutput, ToolError> {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args).arg("--help");
        ChildProcess::run(command, self.timeout)
    }
}

impl CapabilityDetector for WhisperHelpDetector {
    fn detect(&self) -> ToolCapabilities {
        match self.help_output() {
            Ok(output) => {
                let exited_cleanly = output.success();
                if !exited_cleanly {
                    log::warn!(
                        "{} --help exited with {}",
                        self.program.display(),
                        output.exit_code
                    );
                }
                let text = [output.stdout, output.stderr].concat().join("\n");
                ToolCapabilities::from_help_text(&text, exited_cleanly)
            }
            Err(e) => {
                log::error!(
                    "Error getting capabilities from {}: {e}",
                    self.program.display()
                );
                ToolCapabilities::unavailable()
            }
        }
    }
}
