use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::jobs::domain::job_key::JobKey;
use crate::jobs::job_registry::JobRegistry;
use crate::media::domain::caption_inspector::CaptionInspector;
use crate::media::domain::duration_probe::DurationProbe;
use crate::shared::constants::{AUDIO_EXTENSIONS, CAPTION_EXTENSION};

/// Per-item status shown to operators.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemInfo {
    pub duration: f64,
    pub size: u64,
    #[serde(rename = "vtt_exists")]
    pub caption_exists: bool,
    pub has_word_timestamps: bool,
    pub job_running: bool,
}

/// On-disk layout of collections and their items.
///
/// ```text
/// root/
///     My Book/
///         01.mp3
///         01.vtt   <- caption written next to its item
///         02.mp3
/// ```
#[derive(Clone, Debug)]
pub struct AudioLibrary {
    root: PathBuf,
}

impl AudioLibrary {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Collection names (subdirectories of the root), sorted.
    pub fn collections(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    pub fn has_collection(&self, collection: &str) -> bool {
        self.collection_dir(collection).is_dir()
    }

    /// Audio item names in a collection, sorted.
    pub fn items(&self, collection: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.collection_dir(collection))? {
            let path = entry?.path();
            if path.is_file() && is_audio(&path) {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn item_path(&self, collection: &str, item: &str) -> PathBuf {
        self.collection_dir(collection).join(item)
    }

    pub fn caption_path(&self, collection: &str, item: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(Path::new(item).with_extension(CAPTION_EXTENSION))
    }

    pub fn has_caption(&self, collection: &str, item: &str) -> bool {
        self.caption_path(collection, item).exists()
    }

    /// Items that still need a caption.
    pub fn pending_items(&self, collection: &str) -> io::Result<Vec<String>> {
        Ok(self
            .items(collection)?
            .into_iter()
            .filter(|item| !self.has_caption(collection, item))
            .collect())
    }

    /// Items that already have a caption, i.e. playable with text.
    pub fn captioned_items(&self, collection: &str) -> io::Result<Vec<String>> {
        Ok(self
            .items(collection)?
            .into_iter()
            .filter(|item| self.has_caption(collection, item))
            .collect())
    }

    pub fn file_info(
        &self,
        collection: &str,
        probe: &dyn DurationProbe,
        inspector: &dyn CaptionInspector,
        registry: &JobRegistry,
    ) -> io::Result<BTreeMap<String, ItemInfo>> {
        let mut info = BTreeMap::new();
        for item in self.items(collection)? {
            let path = self.item_path(collection, &item);
            let caption = self.caption_path(collection, &item);
            let caption_exists = caption.exists();
            let entry = ItemInfo {
                duration: probe.duration(&path),
                size: fs::metadata(&path)?.len(),
                caption_exists,
                has_word_timestamps: caption_exists && inspector.has_word_timestamps(&caption),
                job_running: registry.is_running(&JobKey::new(collection, item.as_str())),
            };
            info.insert(item, entry);
        }
        Ok(info)
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
