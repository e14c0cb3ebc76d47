use std::io;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::tool_invocation::ToolInvocation;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read tool output: {0}")]
    Read(#[source] io::Error),
    #[error("failed to wait for tool exit: {0}")]
    Wait(#[source] io::Error),
    #[error("tool did not finish within {0:?}")]
    TimedOut(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of tool output, without its terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// Captured result of a tool run driven to completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// A started tool process whose combined output can be pulled line by line.
pub trait RunningTool: Send {
    fn pid(&self) -> Option<u32>;

    /// Next output line from either stream, in arrival order.
    ///
    /// Returns `Ok(None)` once both streams are closed and
    /// `Err(ToolError::TimedOut)` if `deadline` passes first.
    fn read_line(&mut self, deadline: Option<Instant>) -> Result<Option<OutputLine>, ToolError>;

    /// Wait for the process to exit and return its exit code (-1 when
    /// terminated by a signal).
    fn wait(&mut self, deadline: Option<Instant>) -> Result<i32, ToolError>;

    fn kill(&mut self);
}

/// Port for the external speech-to-text tool.
pub trait TranscriptionTool: Send + Sync {
    /// Printable command line for `invocation`.
    fn describe(&self, invocation: &ToolInvocation) -> String;

    fn start(&self, invocation: &ToolInvocation) -> Result<Box<dyn RunningTool>, ToolError>;

    /// Run to completion, capturing output. Exceeding `timeout` kills the
    /// process and yields `ToolError::TimedOut`.
    fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> Result<ToolOutput, ToolError> {
        let deadline = Instant::now() + timeout;
        let mut process = self.start(invocation)?;
        drive_to_completion(process.as_mut(), deadline).map_err(|e| match e {
            ToolError::TimedOut(_) => ToolError::TimedOut(timeout),
            other => other,
        })
    }
}

/// Drain `process` and wait for its exit, killing it if `deadline` passes
/// or reading fails.
pub fn drive_to_completion(
    process: &mut dyn RunningTool,
    deadline: Instant,
) -> Result<ToolOutput, ToolError> {
    let mut output = ToolOutput::default();

    loop {
        match process.read_line(Some(deadline)) {
            Ok(Some(line)) => match line.stream {
                OutputStream::Stdout => output.stdout.push(line.text),
                OutputStream::Stderr => output.stderr.push(line.text),
            },
            Ok(None) => break,
            Err(e) => {
                process.kill();
                return Err(e);
            }
        }
    }

    match process.wait(Some(deadline)) {
        Ok(code) => {
            output.exit_code = code;
            Ok(output)
        }
        Err(e) => {
            process.kill();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::thread;

    struct ScriptedProcess {
        lines: VecDeque<OutputLine>,
        delay: Duration,
        exit_code: i32,
        killed: bool,
    }

    impl RunningTool for ScriptedProcess {
        fn pid(&self) -> Option<u32> {
            None
        }

        fn read_line(
            &mut self,
            deadline: Option<Instant>,
        ) -> Result<Option<OutputLine>, ToolError> {
            if let Some(d) = deadline {
                if Instant::now() + self.delay > d {
                    return Err(ToolError::TimedOut(Duration::ZERO));
                }
            }
            thread::sleep(self.delay);
            Ok(self.lines.pop_front())
        }

        fn wait(&mut self, _deadline: Option<Instant>) -> Result<i32, ToolError> {
            Ok(self.exit_code)
        }

        fn kill(&mut self) {
            self.killed = true;
        }
    }

    struct ScriptedTool {
        lines: Vec<OutputLine>,
        delay: Duration,
        exit_code: i32,
    }

    impl TranscriptionTool for ScriptedTool {
        fn describe(&self, _: &ToolInvocation) -> String {
            "scripted".to_string()
        }

        fn start(&self, _: &ToolInvocation) -> Result<Box<dyn RunningTool>, ToolError> {
            Ok(Box::new(ScriptedProcess {
                lines: self.lines.iter().cloned().collect(),
                delay: self.delay,
                exit_code: self.exit_code,
                killed: false,
            }))
        }
    }

    fn line(stream: OutputStream, text: &str) -> OutputLine {
        OutputLine {
            stream,
            text: text.to_string(),
        }
    }

    fn invocation() -> ToolInvocation {
        ToolInvocation::new(std::path::Path::new("a.mp3"), "tiny", std::path::Path::new("."))
    }

    #[test]
    fn test_run_splits_streams() {
        let tool = ScriptedTool {
            lines: vec![
                line(OutputStream::Stdout, "[00:00.000 --> 00:01.000] hi"),
                line(OutputStream::Stderr, "warning"),
            ],
            delay: Duration::ZERO,
            exit_code: 0,
        };

        let output = tool.run(&invocation(), Duration::from_secs(5)).unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, vec!["[00:00.000 --> 00:01.000] hi"]);
        assert_eq!(output.stderr_text(), "warning");
    }

    #[test]
    fn test_run_reports_exit_code() {
        let tool = ScriptedTool {
            lines: vec![line(OutputStream::Stderr, "boom")],
            delay: Duration::ZERO,
            exit_code: 2,
        };

        let output = tool.run(&invocation(), Duration::from_secs(5)).unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, 2);
    }

    #[test]
    fn test_run_times_out_with_requested_duration() {
        let tool = ScriptedTool {
            lines: vec![line(OutputStream::Stdout, "slow")],
            delay: Duration::from_millis(200),
            exit_code: 0,
        };

        let err = tool
            .run(&invocation(), Duration::from_millis(20))
            .unwrap_err();

        assert!(matches!(err, ToolError::TimedOut(d) if d == Duration::from_millis(20)));
    }
}
