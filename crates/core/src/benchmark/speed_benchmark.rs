use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::domain::speed_test_result::{compute_speed_ratio, SpeedTestResult};
use crate::capabilities::capability_probe::CapabilityProbe;
use crate::capabilities::domain::feature_flags::FeatureFlags;
use crate::media::domain::duration_probe::DurationProbe;
use crate::shared::constants::SPEED_TEST_TIMEOUT;
use crate::tool::domain::tool_invocation::ToolInvocation;
use crate::tool::domain::transcription_tool::{ToolError, TranscriptionTool};

pub const TIMEOUT_MESSAGE: &str = "Transcription speed test timed out";

/// Times one tool run against a short sample clip.
pub struct SpeedBenchmark {
    tool: Arc<dyn TranscriptionTool>,
    capabilities: Arc<CapabilityProbe>,
    probe: Arc<dyn DurationProbe>,
    timeout: Duration,
}

impl SpeedBenchmark {
    pub fn new(
        tool: Arc<dyn TranscriptionTool>,
        capabilities: Arc<CapabilityProbe>,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self {
            tool,
            capabilities,
            probe,
            timeout: SPEED_TEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the tool on `clip` with `requested` resolved against the tool's
    /// capabilities. The caption it writes goes to a scratch directory that
    /// is removed afterwards. Never persists anything.
    pub fn measure(&self, clip: &Path, model: &str, requested: FeatureFlags) -> SpeedTestResult {
        let features = self.capabilities.get().resolve(requested);
        let mut result = SpeedTestResult {
            success: false,
            processing_time: 0.0,
            audio_duration: 0.0,
            speed_ratio: 0.0,
            model_tested: model.to_string(),
            settings_tested: requested,
            error: None,
        };

        let scratch = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => {
                log::error!("Speed test could not create scratch directory: {e}");
                result.error = Some(e.to_string());
                return result;
            }
        };
        let invocation = ToolInvocation::new(clip, model, scratch.path())
            .with_features(features.word_timestamps, features.highlighting);

        log::info!(
            "Speed test: {} ({} s timeout)",
            self.tool.describe(&invocation),
            self.timeout.as_secs()
        );
        let started = Instant::now();
        let outcome = self.tool.run(&invocation, self.timeout);
        let elapsed = started.elapsed().as_secs_f64();
        result.audio_duration = self.probe.duration(clip);

        match outcome {
            Ok(output) => {
                result.success = output.success();
                result.processing_time = elapsed;
                result.speed_ratio = compute_speed_ratio(result.audio_duration, elapsed);
                if !result.success {
                    log::warn!("Speed test exited with {}", output.exit_code);
                    result.error = Some(output.stderr_text());
                }
            }
            Err(ToolError::TimedOut(_)) => {
                log::warn!("Speed test timed out after {:?}", self.timeout);
                result.processing_time = self.timeout.as_secs_f64();
                result.error = Some(TIMEOUT_MESSAGE.to_string());
            }
            Err(e) => {
                log::error!("Speed test failed: {e}");
                result.processing_time = elapsed;
                result.error = Some(e.to_string());
            }
        }
        result
    }
}
