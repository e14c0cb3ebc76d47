use serde::{Deserialize, Serialize};

/// Caption features a caller asks for. These are requests: what the tool
/// actually does is decided by [`super::tool_capabilities::ToolCapabilities::resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "enabled")]
    pub word_timestamps: bool,
    #[serde(default = "enabled")]
    pub highlighting: bool,
}

fn enabled() -> bool {
    true
}

impl FeatureFlags {
    pub fn new(word_timestamps: bool, highlighting: bool) -> Self {
        Self {
            word_timestamps,
            highlighting,
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::new(true, true)
    }
}
