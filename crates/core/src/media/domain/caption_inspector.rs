use std::path::Path;

/// Domain interface for judging whether a caption artifact carries
/// word-level timing. Best-effort; a missing or unreadable file is `false`.
pub trait CaptionInspector: Send + Sync {
    fn has_word_timestamps(&self, caption_path: &Path) -> bool;
}
