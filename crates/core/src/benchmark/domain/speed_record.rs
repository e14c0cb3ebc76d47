use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::speed_test_result::SpeedTestResult;
use crate::capabilities::domain::feature_flags::FeatureFlags;

/// Persisted result of the latest usable benchmark for one configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedRecord {
    pub speed_ratio: f64,
    pub model_tested: String,
    #[serde(rename = "settings_key_info")]
    pub settings: FeatureFlags,
    #[serde(rename = "test_audio_duration")]
    pub audio_duration: f64,
    #[serde(rename = "test_processing_time")]
    pub processing_time: f64,
    /// ISO-8601 UTC, e.g. `2024-05-01T12:00:00.000000Z`.
    pub timestamp: String,
}

impl SpeedRecord {
    pub fn from_result(result: &SpeedTestResult, at: DateTime<Utc>) -> Self {
        Self {
            speed_ratio: result.speed_ratio,
            model_tested: result.model_tested.clone(),
            settings: result.settings_tested,
            audio_duration: result.audio_duration,
            processing_time: result.processing_time,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}
