use std::path::{Path, PathBuf};
use std::process::Command;

use crate::shared::constants::{CAPTION_EXTENSION, WHISPER_PROGRAM};
use crate::tool::domain::tool_invocation::ToolInvocation;
use crate::tool::domain::transcription_tool::{RunningTool, ToolError, TranscriptionTool};

use super::child_process::ChildProcess;

/// Transcription tool backed by the `whisper` command-line program.
#[derive(Clone, Debug)]
pub struct WhisperCli {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl WhisperCli {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before the per-run arguments, e.g. `["-m", "whisper"]`
    /// when the program is a Python interpreter.
    pub fn with_leading_args(mut self, args: &[String]) -> Self {
        self.leading_args = args.to_vec();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for one run. FP16 is always disabled to keep CPU runs
    /// consistent and silence the FP16 warning.
    pub fn args(invocation: &ToolInvocation) -> Vec<String> {
        let mut args = vec![
            invocation.input.display().to_string(),
            "--model".to_string(),
            invocation.model.clone(),
            "--output_format".to_string(),
            CAPTION_EXTENSION.to_string(),
            "--output_dir".to_string(),
            invocation.output_dir.display().to_string(),
            "--fp16".to_string(),
            "False".to_string(),
        ];
        if invocation.word_timestamps {
            args.extend(["--word_timestamps".to_string(), "True".to_string()]);
            if invocation.highlight_words {
                args.extend(["--highlight_words".to_string(), "True".to_string()]);
            }
        }
        args
    }
}

impl Default for WhisperCli {
    fn default() -> Self {
        Self::new(Path::new(WHISPER_PROGRAM))
    }
}

impl TranscriptionTool for WhisperCli {
    fn describe(&self, invocation: &ToolInvocation) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.leading_args.iter().cloned());
        parts.extend(Self::args(invocation));
        parts.join(" ")
    }

    fn start(&self, invocation: &ToolInvocation) -> Result<Box<dyn RunningTool>, ToolError> {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args).args(Self::args(invocation));
        log::debug!("Spawning: {}", self.describe(invocation));
        Ok(Box::new(ChildProcess::spawn(command)?))
    }
}
