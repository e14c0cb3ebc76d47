use std::io;
use std::path::Path;
use std::time::Duration;

use tempfile::TempPath;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("failed to create temporary clip file: {0}")]
    TempFile(#[source] io::Error),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("clip extraction failed with exit code {code}: {stderr}")]
    Failed { code: i32, stderr: String },
    #[error("clip extraction produced an empty file from {0}")]
    Empty(String),
    #[error("clip extraction timed out after {0:?}")]
    TimedOut(Duration),
    #[error("clip extraction failed: {0}")]
    Other(String),
}

/// Domain interface for cutting a short clip from the start of a media file.
///
/// The returned [`TempPath`] owns the clip; dropping it deletes the file.
pub trait ClipExtractor: Send + Sync {
    fn extract(&self, source: &Path, seconds: u32) -> Result<TempPath, MediaError>;
}
