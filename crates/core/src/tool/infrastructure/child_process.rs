use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::tool::domain::transcription_tool::{
    drive_to_completion, OutputLine, OutputStream, RunningTool, ToolError, ToolOutput,
};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

type LineResult = Result<OutputLine, io::Error>;

/// A spawned process whose stdout and stderr are merged into one line channel.
///
/// Layout: `stdout reader ─┐`
///         `stderr reader ─┴→ channel → read_line()`
///
/// Each stream is drained by its own thread so the process never stalls on
/// a full pipe while the other stream is being read. Lines arrive in the
/// order the reader threads see them. Both `\n` and `\r` terminate a line,
/// so carriage-return progress bars surface as separate lines.
pub struct ChildProcess {
    child: Child,
    lines: Receiver<LineResult>,
    exit_code: Option<i32>,
}

impl ChildProcess {
    pub fn spawn(mut command: Command) -> Result<Self, ToolError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let program = command.get_program().to_string_lossy().into_owned();
        let mut child = command
            .spawn()
            .map_err(|source| ToolError::Spawn { program, source })?;

        let (tx, rx) = crossbeam_channel::unbounded::<LineResult>();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, OutputStream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, OutputStream::Stderr, tx);
        }

        Ok(Self {
            child,
            lines: rx,
            exit_code: None,
        })
    }

    /// Spawn `command` and capture its output, killing it after `timeout`.
    pub fn run(command: Command, timeout: Duration) -> Result<ToolOutput, ToolError> {
        let deadline = Instant::now() + timeout;
        let mut process = Self::spawn(command)?;
        drive_to_completion(&mut process, deadline).map_err(|e| match e {
            ToolError::TimedOut(_) => ToolError::TimedOut(timeout),
            other => other,
        })
    }
}

impl RunningTool for ChildProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn read_line(&mut self, deadline: Option<Instant>) -> Result<Option<OutputLine>, ToolError> {
        let received = match deadline {
            None => self.lines.recv().ok(),
            Some(d) => match self.lines.recv_deadline(d) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Disconnected) => None,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ToolError::TimedOut(d.saturating_duration_since(Instant::now())))
                }
            },
        };

        match received {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(ToolError::Read(e)),
            None => Ok(None),
        }
    }

    fn wait(&mut self, deadline: Option<Instant>) -> Result<i32, ToolError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        let status = match deadline {
            None => self.child.wait().map_err(ToolError::Wait)?,
            Some(d) => loop {
                if let Some(status) = self.child.try_wait().map_err(ToolError::Wait)? {
                    break status;
                }
                if Instant::now() >= d {
                    return Err(ToolError::TimedOut(Duration::ZERO));
                }
                thread::sleep(WAIT_POLL_INTERVAL);
            },
        };

        let code = status.code().unwrap_or(-1);
        self.exit_code = Some(code);
        Ok(code)
    }

    fn kill(&mut self) {
        if self.exit_code.is_some() {
            return;
        }
        if let Err(e) = self.child.kill() {
            log::warn!("Failed to kill process {}: {e}", self.child.id());
        }
        if let Ok(status) = self.child.wait() {
            self.exit_code = Some(status.code().unwrap_or(-1));
        }
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(
    reader: R,
    stream: OutputStream,
    tx: Sender<LineResult>,
) {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            match read_segment(&mut reader, &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = OutputLine {
                        stream,
                        text: String::from_utf8_lossy(&buf).into_owned(),
                    };
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
}

/// Read bytes up to the next `\n` or `\r` into `buf` (terminator excluded).
/// Returns the number of bytes consumed, 0 at end of stream.
fn read_segment<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    let mut consumed = 0;
    loop {
        let available = match reader.fill_buf() {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(consumed);
        }
        match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(i) => {
                buf.extend_from_slice(&available[..i]);
                reader.consume(i + 1);
                return Ok(consumed + i + 1);
            }
            None => {
                let n = available.len();
                buf.extend_from_slice(available);
                reader.consume(n);
                consumed += n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn segments(input: &[u8]) -> Vec<String> {
        let mut reader = Cursor::new(input.to_vec());
        let mut buf = Vec::new();
        let mut out = Vec::new();
        while read_segment(&mut reader, &mut buf).unwrap() > 0 {
            out.push(String::from_utf8_lossy(&buf).into_owned());
        }
        out
    }

    // --- read_segment ---

    #[test]
    fn test_segments_split_on_newline() {
        assert_eq!(segments(b"a\nb\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_segments_split_on_carriage_return() {
        assert_eq!(segments(b" 10%\r 20%\rdone\n"), vec![" 10%", " 20%", "done"]);
    }

    #[test]
    fn test_segments_crlf_yields_empty_segment() {
        assert_eq!(segments(b"a\r\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_segments_unterminated_tail() {
        assert_eq!(segments(b"tail"), vec!["tail"]);
    }

    #[test]
    fn test_segments_empty_input() {
        assert!(segments(b"").is_empty());
    }

    #[test]
    fn test_segments_invalid_utf8_is_lossy() {
        let out = segments(b"ok\xff\n");
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("ok"));
    }

    // --- ChildProcess (real subprocesses) ---

    #[cfg(unix)]
    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[cfg(unix)]
    fn drain(process: &mut ChildProcess) -> Vec<OutputLine> {
        let mut lines = Vec::new();
        while let Some(line) = process.read_line(None).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[cfg(unix)]
    #[test]
    fn test_merges_stdout_and_stderr() {
        let mut process = ChildProcess::spawn(sh("echo out; echo err 1>&2")).unwrap();
        let lines = drain(&mut process);

        assert_eq!(lines.len(), 2);
        assert!(lines
            .iter()
            .any(|l| l.stream == OutputStream::Stdout && l.text == "out"));
        assert!(lines
            .iter()
            .any(|l| l.stream == OutputStream::Stderr && l.text == "err"));
        assert_eq!(process.wait(None).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_preserves_order_within_stream() {
        let mut process = ChildProcess::spawn(sh("for i in 1 2 3 4 5; do echo $i; done")).unwrap();
        let texts: Vec<_> = drain(&mut process).into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["1", "2", "3", "4", "5"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_reports_nonzero_exit() {
        let mut process = ChildProcess::spawn(sh("exit 3")).unwrap();
        drain(&mut process);
        assert_eq!(process.wait(None).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_lines_stream_before_exit() {
        let mut process = ChildProcess::spawn(sh("echo first; sleep 2; echo second")).unwrap();
        let started = Instant::now();

        let first = process.read_line(None).unwrap().unwrap();

        assert_eq!(first.text, "first");
        assert!(started.elapsed() < Duration::from_millis(1500));
        process.kill();
    }

    #[cfg(unix)]
    #[test]
    fn test_read_line_deadline_times_out() {
        let mut process = ChildProcess::spawn(sh("sleep 5")).unwrap();
        let deadline = Instant::now() + Duration::from_millis(50);

        let err = process.read_line(Some(deadline)).unwrap_err();

        assert!(matches!(err, ToolError::TimedOut(_)));
        process.kill();
        assert_eq!(process.wait(None).unwrap(), -1);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_both_streams() {
        let output = ChildProcess::run(
            sh("echo 12.5; echo oops 1>&2; exit 4"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(output.stdout, vec!["12.5"]);
        assert_eq!(output.stderr, vec!["oops"]);
        assert_eq!(output.exit_code, 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_times_out() {
        let err = ChildProcess::run(sh("exec sleep 5"), Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, ToolError::TimedOut(d) if d == Duration::from_millis(50)));
    }

    #[test]
    fn test_spawn_missing_program_errors() {
        let err = ChildProcess::spawn(Command::new("definitely-not-a-real-program-4711"))
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-a-real-program-4711"));
    }
}
