use serde::Serialize;

use crate::capabilities::domain::feature_flags::FeatureFlags;

/// Outcome of one benchmark run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeedTestResult {
    pub success: bool,
    /// Wall-clock seconds spent in the tool.
    pub processing_time: f64,
    /// Seconds of audio in the sample clip.
    pub audio_duration: f64,
    pub speed_ratio: f64,
    pub model_tested: String,
    /// The configuration as requested, before capability resolution.
    pub settings_tested: FeatureFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpeedTestResult {
    /// Whether this result is worth persisting.
    pub fn is_usable(&self) -> bool {
        self.success && self.speed_ratio > 0.0
    }
}

/// Audio seconds processed per wall-clock second; zero unless both inputs
/// are strictly positive.
pub fn compute_speed_ratio(audio_duration: f64, processing_time: f64) -> f64 {
    if audio_duration > 0.0 && processing_time > 0.0 {
        audio_duration / processing_time
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(10.0, 5.0, 2.0)]
    #[case(15.0, 30.0, 0.5)]
    #[case(0.0, 5.0, 0.0)]
    #[case(10.0, 0.0, 0.0)]
    #[case(-1.0, 5.0, 0.0)]
    fn test_compute_speed_ratio(
        #[case] duration: f64,
        #[case] elapsed: f64,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(compute_speed_ratio(duration, elapsed), expected);
    }

    fn result(success: bool, speed_ratio: f64) -> SpeedTestResult {
        SpeedTestResult {
            success,
            processing_time: 1.0,
            audio_duration: 1.0,
            speed_ratio,
            model_tested: "tiny".to_string(),
            settings_tested: FeatureFlags::default(),
            error: None,
        }
    }

    #[test]
    fn test_usable_requires_success_and_positive_ratio() {
        assert!(result(true, 1.5).is_usable());
        assert!(!result(false, 1.5).is_usable());
        assert!(!result(true, 0.0).is_usable());
    }
}
