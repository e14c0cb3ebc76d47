use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::benchmark::domain::speed_ratio_repository::SpeedRatioRepository;
use crate::benchmark::domain::speed_record::SpeedRecord;
use crate::benchmark::domain::speed_test_config_key::SpeedTestConfigKey;

#[derive(Error, Debug)]
pub enum SpeedStoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize speed ratios: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Speed ratios kept as one JSON object in a flat file, keyed by
/// [`SpeedTestConfigKey`]. Every write rewrites the whole file.
pub struct SpeedRatioStore {
    path: PathBuf,
}

impl SpeedRatioStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored records. An absent or unreadable file is an empty store.
    pub fn load_all(&self) -> BTreeMap<String, SpeedRecord> {
        match self.try_load() {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Ignoring speed ratio store: {e}");
                BTreeMap::new()
            }
        }
    }

    fn try_load(&self) -> Result<BTreeMap<String, SpeedRecord>, SpeedStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(SpeedStoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| SpeedStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn try_write(&self, records: &BTreeMap<String, SpeedRecord>) -> Result<(), SpeedStoreError> {
        let json = serde_json::to_string_pretty(records).map_err(SpeedStoreError::Serialize)?;
        fs::write(&self.path, json).map_err(|source| SpeedStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl SpeedRatioRepository for SpeedRatioStore {
    fn get(&self, key: &SpeedTestConfigKey) -> Option<SpeedRecord> {
        self.load_all().remove(key.as_str())
    }

    fn put(&self, key: &SpeedTestConfigKey, record: SpeedRecord) {
        let mut records = self.load_all();
        records.insert(key.to_string(), record);
        match self.try_write(&records) {
            Ok(()) => log::info!("Saved speed ratio for {key} to {}", self.path.display()),
            Err(e) => log::error!("Dropping speed ratio for {key}: {e}"),
        }
    }
}
