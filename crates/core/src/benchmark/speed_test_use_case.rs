use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::domain::speed_ratio_repository::SpeedRatioRepository;
use super::domain::speed_record::SpeedRecord;
use super::domain::speed_test_config_key::SpeedTestConfigKey;
use super::domain::time_estimate::{estimate_times, TimeEstimate};
use super::speed_benchmark::SpeedBenchmark;
use crate::capabilities::domain::feature_flags::FeatureFlags;
use crate::library::audio_library::AudioLibrary;
use crate::media::domain::clip_extractor::{ClipExtractor, MediaError};
use crate::shared::constants::{DEFAULT_MODEL, SPEED_TEST_CLIP_SECONDS};

const FAILED_MESSAGE: &str = "Speed test failed or resulted in zero speed ratio.";

#[derive(Error, Debug)]
pub enum SpeedTestError {
    #[error("no audio files in {0}")]
    NoAudio(String),
    #[error("audio file not found: {0}")]
    SourceMissing(PathBuf),
    #[error("could not list {collection}: {source}")]
    Library {
        collection: String,
        #[source]
        source: io::Error,
    },
    #[error("could not extract sample clip: {0}")]
    Clip(#[from] MediaError),
}

/// What an operator sees after a speed test.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeedTestOutcome {
    pub success: bool,
    pub speed_ratio: f64,
    pub model_tested: String,
    pub settings_tested: FeatureFlags,
    /// Estimated processing time per item, from the supplied durations.
    pub estimates: BTreeMap<String, TimeEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Benchmark the tool on a clip from a collection and remember the ratio.
pub struct SpeedTestUseCase {
    library: AudioLibrary,
    extractor: Arc<dyn ClipExtractor>,
    benchmark: SpeedBenchmark,
    store: Arc<dyn SpeedRatioRepository>,
    model: String,
    clip_seconds: u32,
}

impl SpeedTestUseCase {
    pub fn new(
        library: AudioLibrary,
        extractor: Arc<dyn ClipExtractor>,
        benchmark: SpeedBenchmark,
        store: Arc<dyn SpeedRatioRepository>,
    ) -> Self {
        Self {
            library,
            extractor,
            benchmark,
            store,
            model: DEFAULT_MODEL.to_string(),
            clip_seconds: SPEED_TEST_CLIP_SECONDS,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_clip_seconds(mut self, seconds: u32) -> Self {
        self.clip_seconds = seconds;
        self
    }

    /// Latest stored ratio for `features` with this use case's model.
    pub fn lookup(&self, features: FeatureFlags) -> Option<SpeedRecord> {
        self.store
            .get(&SpeedTestConfigKey::new(&self.model, features))
    }

    /// Measure on a clip of the shortest item with a known duration (or the
    /// first item when none is known). `durations` also feeds the returned
    /// estimates.
    pub fn execute(
        &self,
        collection: &str,
        features: FeatureFlags,
        durations: &BTreeMap<String, f64>,
    ) -> Result<SpeedTestOutcome, SpeedTestError> {
        let items = self
            .library
            .items(collection)
            .map_err(|source| SpeedTestError::Library {
                collection: collection.to_string(),
                source,
            })?;
        let source_item = pick_source(&items, durations)
            .ok_or_else(|| SpeedTestError::NoAudio(collection.to_string()))?;
        let source = self.library.item_path(collection, source_item);
        if !source.exists() {
            return Err(SpeedTestError::SourceMissing(source));
        }

        log::info!("Speed test on {collection}/{source_item}");
        let clip = self.extractor.extract(&source, self.clip_seconds)?;
        let result = self.benchmark.measure(&clip, &self.model, features);
        drop(clip);

        if !result.is_usable() {
            log::warn!("Speed test on {collection} produced no usable ratio");
            return Ok(SpeedTestOutcome {
                success: false,
                speed_ratio: 0.0,
                model_tested: result.model_tested,
                settings_tested: features,
                estimates: BTreeMap::new(),
                error: Some(result.error.unwrap_or_else(|| FAILED_MESSAGE.to_string())),
            });
        }

        let key = SpeedTestConfigKey::new(&self.model, features);
        self.store.put(&key, SpeedRecord::from_result(&result, Utc::now()));

        Ok(SpeedTestOutcome {
            success: true,
            speed_ratio: result.speed_ratio,
            model_tested: result.model_tested,
            settings_tested: features,
            estimates: estimate_times(
                durations.iter().map(|(item, d)| (item.as_str(), *d)),
                result.speed_ratio,
            ),
            error: None,
        })
    }
}

fn pick_source<'a>(items: &'a [String], durations: &BTreeMap<String, f64>) -> Option<&'a str> {
    items
        .iter()
        .filter_map(|item| {
            durations
                .get(item)
                .filter(|d| **d > 0.0)
                .map(|d| (item, *d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(item, _)| item.as_str())
        .or_else(|| items.first().map(String::as_str))
}
