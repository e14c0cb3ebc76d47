use super::tool_capabilities::ToolCapabilities;

/// Domain interface for querying the transcription tool's features.
///
/// Detection never fails: a missing or broken tool is reported as
/// [`ToolCapabilities::unavailable`].
pub trait CapabilityDetector: Send + Sync {
    fn detect(&self) -> ToolCapabilities;
}
