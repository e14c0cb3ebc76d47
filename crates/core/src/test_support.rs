//! Stubs shared by the orchestration tests.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::capabilities::capability_probe::CapabilityProbe;
use crate::capabilities::domain::tool_capabilities::ToolCapabilities;
use crate::jobs::job_registry::JobRegistry;
use crate::library::audio_library::AudioLibrary;
use crate::media::domain::caption_inspector::CaptionInspector;
use crate::media::domain::duration_probe::DurationProbe;
use crate::tool::domain::tool_invocation::ToolInvocation;
use crate::tool::domain::transcription_tool::{
    OutputLine, OutputStream, RunningTool, ToolError, TranscriptionTool,
};
use crate::transcription::transcription_runner::TranscriptionRunner;

// ─── Fake tool ───

/// What a fake tool run does for one input file.
#[derive(Clone, Debug)]
pub struct Script {
    pub lines: Vec<(OutputStream, String)>,
    pub exit_code: i32,
    /// Sleep before the first line.
    pub delay: Duration,
    /// Caption content written when the process is waited on.
    pub caption: Option<String>,
    pub panic_on_start: bool,
    pub fail_to_start: bool,
}

impl Script {
    pub fn ok(lines: &[&str]) -> Self {
        Self {
            lines: lines
                .iter()
                .map(|l| (OutputStream::Stdout, l.to_string()))
                .collect(),
            exit_code: 0,
            delay: Duration::ZERO,
            caption: Some("WEBVTT\n".to_string()),
            panic_on_start: false,
            fail_to_start: false,
        }
    }

    pub fn failing(code: i32, stderr: &[&str]) -> Self {
        Self {
            lines: stderr
                .iter()
                .map(|l| (OutputStream::Stderr, l.to_string()))
                .collect(),
            exit_code: code,
            caption: None,
            ..Self::ok(&[])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_caption(mut self, caption: Option<&str>) -> Self {
        self.caption = caption.map(str::to_string);
        self
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_start: true,
            ..Self::ok(&[])
        }
    }

    pub fn unstartable() -> Self {
        Self {
            fail_to_start: true,
            ..Self::ok(&[])
        }
    }
}

pub struct FakeTool {
    default: Script,
    scripts: HashMap<String, Script>,
    started: Mutex<Vec<ToolInvocation>>,
}

impl FakeTool {
    pub fn new(default: Script) -> Self {
        Self {
            default,
            scripts: HashMap::new(),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(mut self, file_name: &str, script: Script) -> Self {
        self.scripts.insert(file_name.to_string(), script);
        self
    }

    pub fn started(&self) -> Vec<ToolInvocation> {
        self.started.lock().unwrap().clone()
    }
}

impl TranscriptionTool for FakeTool {
    fn describe(&self, invocation: &ToolInvocation) -> String {
        format!("fake-whisper {}", invocation.input.display())
    }

    fn start(&self, invocation: &ToolInvocation) -> Result<Box<dyn RunningTool>, ToolError> {
        let name = invocation
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let script = self.scripts.get(&name).unwrap_or(&self.default).clone();
        self.started.lock().unwrap().push(invocation.clone());

        if script.panic_on_start {
            panic!("simulated crash for {name}");
        }
        if script.fail_to_start {
            return Err(ToolError::Spawn {
                program: "fake-whisper".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            });
        }

        Ok(Box::new(FakeProcess {
            lines: script
                .lines
                .into_iter()
                .map(|(stream, text)| OutputLine { stream, text })
                .collect(),
            delay: Some(script.delay),
            exit_code: script.exit_code,
            caption: script.caption.map(|c| (invocation.caption_path(), c)),
        }))
    }
}

struct FakeProcess {
    lines: VecDeque<OutputLine>,
    delay: Option<Duration>,
    exit_code: i32,
    caption: Option<(PathBuf, String)>,
}

impl RunningTool for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn read_line(&mut self, deadline: Option<Instant>) -> Result<Option<OutputLine>, ToolError> {
        if let Some(delay) = self.delay.take() {
            if let Some(d) = deadline {
                if Instant::now() + delay > d {
                    thread::sleep(d.saturating_duration_since(Instant::now()));
                    return Err(ToolError::TimedOut(delay));
                }
            }
            thread::sleep(delay);
        }
        Ok(self.lines.pop_front())
    }

    fn wait(&mut self, _deadline: Option<Instant>) -> Result<i32, ToolError> {
        if let Some((path, content)) = self.caption.take() {
            fs::write(path, content).map_err(ToolError::Wait)?;
        }
        Ok(self.exit_code)
    }

    fn kill(&mut self) {
        self.caption = None;
    }
}

// ─── Media stubs ───

pub struct StubProbe(pub f64);

impl DurationProbe for StubProbe {
    fn duration(&self, _: &Path) -> f64 {
        self.0
    }
}

pub struct StubInspector(pub bool);

impl CaptionInspector for StubInspector {
    fn has_word_timestamps(&self, _: &Path) -> bool {
        self.0
    }
}

// ─── Fixtures ───

pub fn all_capabilities() -> ToolCapabilities {
    ToolCapabilities {
        word_timestamps_available: true,
        highlight_words_available: true,
        installed: true,
    }
}

/// A library root with one collection holding empty `.mp3` items.
pub fn library_with(collection: &str, items: &[&str]) -> (TempDir, AudioLibrary) {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join(collection);
    fs::create_dir_all(&dir).unwrap();
    for item in items {
        fs::write(dir.join(item), b"ID3").unwrap();
    }
    let library = AudioLibrary::new(tmp.path());
    (tmp, library)
}

pub fn runner(library: &AudioLibrary, tool: Arc<FakeTool>) -> TranscriptionRunner {
    TranscriptionRunner::new(
        library.clone(),
        Arc::new(JobRegistry::new()),
        Arc::new(CapabilityProbe::fixed(all_capabilities())),
        tool,
        Arc::new(StubInspector(true)),
    )
}
