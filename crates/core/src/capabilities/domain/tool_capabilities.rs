use serde::{Deserialize, Serialize};

use super::feature_flags::FeatureFlags;

/// Optional features the installed transcription tool supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCapabilities {
    pub word_timestamps_available: bool,
    pub highlight_words_available: bool,
    pub installed: bool,
}

impl ToolCapabilities {
    /// Capabilities of a tool that is missing or could not be queried.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Read capabilities off the tool's `--help` output. A failed help
    /// invocation means nothing is available, whatever it printed.
    pub fn from_help_text(help_text: &str, exited_cleanly: bool) -> Self {
        if !exited_cleanly {
            return Self::unavailable();
        }
        Self {
            word_timestamps_available: help_text.contains("--word_timestamps"),
            highlight_words_available: help_text.contains("--highlight_words"),
            installed: true,
        }
    }

    /// Effective flags: each request ANDed with support. Highlighting only
    /// applies on top of word timestamps.
    pub fn resolve(&self, requested: FeatureFlags) -> FeatureFlags {
        let word_timestamps = requested.word_timestamps && self.word_timestamps_available;
        let highlighting =
            word_timestamps && requested.highlighting && self.highlight_words_available;
        FeatureFlags::new(word_timestamps, highlighting)
    }
}
