use std::fmt;

use crate::capabilities::domain::feature_flags::FeatureFlags;

/// Identifies one (model, features) combination in the speed-ratio store.
///
/// Rendered as `model:WordTimestamps:Highlighting` with `True`/`False`
/// tokens, e.g. `medium:True:False`. The two trailing tokens are fixed, so
/// distinct configurations never share a key even when the model name
/// itself contains a colon.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeedTestConfigKey(String);

impl SpeedTestConfigKey {
    pub fn new(model: &str, features: FeatureFlags) -> Self {
        Self(format!(
            "{model}:{}:{}",
            flag(features.word_timestamps),
            flag(features.highlighting)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeedTestConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
