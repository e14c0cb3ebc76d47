use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capabilities::capability_probe::CapabilityProbe;
use crate::capabilities::domain::feature_flags::FeatureFlags;
use crate::jobs::domain::job_key::JobKey;
use crate::jobs::job_registry::{JobGuard, JobRegistry};
use crate::library::audio_library::AudioLibrary;
use crate::media::domain::caption_inspector::CaptionInspector;
use crate::shared::constants::DEFAULT_MODEL;
use crate::tool::domain::tool_invocation::ToolInvocation;
use crate::tool::domain::transcription_tool::{RunningTool, TranscriptionTool};

/// One item to caption, with the features the caller asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub collection: String,
    pub item: String,
    pub features: FeatureFlags,
}

impl TranscriptionRequest {
    pub fn new(collection: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            item: item.into(),
            features: FeatureFlags::default(),
        }
    }

    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn key(&self) -> JobKey {
        JobKey::new(self.collection.as_str(), self.item.as_str())
    }
}

/// Runs the transcription tool for single items and narrates progress.
///
/// Cheap to clone; clones share the registry, capability cache and tool.
#[derive(Clone)]
pub struct TranscriptionRunner {
    library: AudioLibrary,
    model: String,
    registry: Arc<JobRegistry>,
    capabilities: Arc<CapabilityProbe>,
    tool: Arc<dyn TranscriptionTool>,
    inspector: Arc<dyn CaptionInspector>,
}

impl TranscriptionRunner {
    pub fn new(
        library: AudioLibrary,
        registry: Arc<JobRegistry>,
        capabilities: Arc<CapabilityProbe>,
        tool: Arc<dyn TranscriptionTool>,
        inspector: Arc<dyn CaptionInspector>,
    ) -> Self {
        Self {
            library,
            model: DEFAULT_MODEL.to_string(),
            registry,
            capabilities,
            tool,
            inspector,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn library(&self) -> &AudioLibrary {
        &self.library
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Start narrating `request`. Nothing happens until the first line is
    /// pulled; the tool's output is relayed as it arrives.
    ///
    /// The job stays registered while the tool runs and is released once
    /// it exits, fails, or the narration is dropped.
    pub fn run(&self, request: TranscriptionRequest) -> Narration {
        Narration {
            runner: self.clone(),
            request,
            pending: VecDeque::new(),
            state: State::NotStarted,
        }
    }
}

/// Progress lines of one transcription, in order.
pub struct Narration {
    runner: TranscriptionRunner,
    request: TranscriptionRequest,
    pending: VecDeque<String>,
    state: State,
}

enum State {
    NotStarted,
    Streaming {
        process: Box<dyn RunningTool>,
        guard: JobGuard,
        caption_path: PathBuf,
    },
    Finished,
}

impl Narration {
    fn start(&mut self) {
        let runner = &self.runner;
        let request = &self.request;

        let source = runner.library.item_path(&request.collection, &request.item);
        if !source.exists() {
            log::warn!("Audio file not found: {}", source.display());
            self.pending
                .push_back(format!("Error: audio file not found: {}", source.display()));
            return;
        }

        let features = runner.capabilities.get().resolve(request.features);
        let invocation = ToolInvocation::new(
            &source,
            &runner.model,
            &runner.library.collection_dir(&request.collection),
        )
        .with_features(features.word_timestamps, features.highlighting);

        let guard = match runner.registry.acquire(request.key()) {
            Ok(guard) => guard,
            Err(e) => {
                log::warn!("{e}");
                self.pending.push_back(format!("Error: {e}"));
                return;
            }
        };

        self.pending.extend([
            format!("Starting Whisper transcription for: {}", request.item),
            format!("Command: {}", runner.tool.describe(&invocation)),
            format!("Word timestamps: {}", on_off(features.word_timestamps)),
            format!("Word highlighting: {}", on_off(features.highlighting)),
        ]);

        match runner.tool.start(&invocation) {
            Ok(process) => {
                if let Some(pid) = process.pid() {
                    guard.attach_pid(pid);
                }
                log::info!("Transcribing {} (pid {:?})", guard.key(), process.pid());
                self.state = State::Streaming {
                    process,
                    guard,
                    caption_path: invocation.caption_path(),
                };
            }
            Err(e) => {
                log::error!("Transcription of {} failed to start: {e}", guard.key());
                self.pending.push_back(format!("EXCEPTION: {e}"));
            }
        }
    }

    fn finish(
        &mut self,
        mut process: Box<dyn RunningTool>,
        guard: JobGuard,
        caption_path: PathBuf,
    ) {
        let exit = process.wait(None);
        drop(guard);

        let code = match exit {
            Ok(code) => code,
            Err(e) => {
                log::error!("Transcription of {} failed: {e}", self.request.item);
                self.pending.push_back(format!("EXCEPTION: {e}"));
                return;
            }
        };

        if caption_path.exists() {
            let word_level = self.runner.inspector.has_word_timestamps(&caption_path);
            self.pending.extend([
                format!("SUCCESS: VTT file created at {}", caption_path.display()),
                format!("Word-level timestamps: {}", if word_level { "Yes" } else { "No" }),
            ]);
        } else {
            self.pending.push_back(format!(
                "WARNING: expected VTT file not found at {}",
                caption_path.display()
            ));
        }

        if code == 0 {
            log::info!("Transcribed {}", self.request.item);
            self.pending
                .push_back(format!("[DONE {} - SUCCESS]", self.request.item));
        } else {
            log::error!("Transcription of {} exited with {code}", self.request.item);
            self.pending.push_back(format!(
                "ERROR: transcription process failed with exit code {code}"
            ));
        }
    }
}

impl Iterator for Narration {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(line);
            }

            match std::mem::replace(&mut self.state, State::Finished) {
                State::NotStarted => self.start(),
                State::Streaming {
                    mut process,
                    guard,
                    caption_path,
                } => match process.read_line(None) {
                    Ok(Some(line)) => {
                        self.state = State::Streaming {
                            process,
                            guard,
                            caption_path,
                        };
                        let text = line.text.trim_end();
                        if !text.is_empty() {
                            return Some(text.to_string());
                        }
                    }
                    Ok(None) => self.finish(process, guard, caption_path),
                    Err(e) => {
                        log::error!("Lost output of {}: {e}", guard.key());
                        process.kill();
                        self.pending.push_back(format!("EXCEPTION: {e}"));
                    }
                },
                State::Finished => return None,
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
