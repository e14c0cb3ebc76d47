use std::fs;
use std::path::Path;

use crate::media::domain::caption_inspector::CaptionInspector;

/// Number of word-level indicators at which a caption counts as word-level.
pub const WORD_LEVEL_THRESHOLD: usize = 3;

/// Cues shorter than this many seconds look like single words.
const SHORT_CUE_SECONDS: f64 = 2.0;

/// Heuristic WebVTT inspector.
///
/// Counts lines with highlight markup (`<u>`, `<c>`, `<c.highlight>`) and
/// cue timing lines spanning under two seconds. Three or more indicators
/// mean word-level timing.
#[derive(Clone, Copy, Debug, Default)]
pub struct VttCaptionInspector;

impl VttCaptionInspector {
    pub fn count_indicators(content: &str) -> usize {
        content
            .split('\n')
            .filter(|line| {
                if line.contains("<u>") || line.contains("<c>") || line.contains("<c.highlight>") {
                    true
                } else if line.contains("-->") {
                    is_short_cue(line)
                } else {
                    false
                }
            })
            .count()
    }
}

impl CaptionInspector for VttCaptionInspector {
    fn has_word_timestamps(&self, caption_path: &Path) -> bool {
        match fs::read_to_string(caption_path) {
            Ok(content) => Self::count_indicators(&content) >= WORD_LEVEL_THRESHOLD,
            Err(_) => false,
        }
    }
}

/// Only the seconds field of each timestamp is compared, so cues crossing a
/// minute boundary are not counted.
fn is_short_cue(line: &str) -> bool {
    let parts: Vec<&str> = line.split("-->").collect();
    if parts.len() != 2 {
        return false;
    }
    match (seconds_field(parts[0]), seconds_field(parts[1])) {
        (Some(start), Some(end)) => {
            let span = end - start;
            span > 0.0 && span < SHORT_CUE_SECONDS
        }
        _ => false,
    }
}

fn seconds_field(timestamp: &str) -> Option<f64> {
    timestamp.trim().rsplit(':').next()?.trim().parse().ok()
}
