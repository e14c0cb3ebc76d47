use std::path::Path;

/// Domain interface for reading a media file's duration.
///
/// Fails soft: implementations may fall back to an estimate and return
/// `0.0` when nothing can be determined. They never error.
pub trait DurationProbe: Send + Sync {
    fn duration(&self, path: &Path) -> f64;
}
