use std::path::{Path, PathBuf};

use crate::shared::constants::CAPTION_EXTENSION;

/// Everything the transcription tool needs for one run.
///
/// Feature flags here are already resolved against the tool's
/// capabilities; they are what the tool will actually be asked to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    pub input: PathBuf,
    pub model: String,
    pub output_dir: PathBuf,
    pub word_timestamps: bool,
    pub highlight_words: bool,
}

impl ToolInvocation {
    pub fn new(input: &Path, model: &str, output_dir: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            model: model.to_string(),
            output_dir: output_dir.to_path_buf(),
            word_timestamps: false,
            highlight_words: false,
        }
    }

    pub fn with_features(mut self, word_timestamps: bool, highlight_words: bool) -> Self {
        self.word_timestamps = word_timestamps;
        self.highlight_words = highlight_words;
        self
    }

    /// Where the tool writes its caption artifact: the input's base name
    /// with the caption extension, inside the output directory.
    pub fn caption_path(&self) -> PathBuf {
        let file_name = self.input.file_name().unwrap_or(self.input.as_os_str());
        self.output_dir
            .join(Path::new(file_name).with_extension(CAPTION_EXTENSION))
    }
}
