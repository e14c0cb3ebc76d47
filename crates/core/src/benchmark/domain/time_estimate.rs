use std::collections::BTreeMap;

use serde::Serialize;

/// Expected processing time for one item.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimeEstimate {
    pub duration: f64,
    pub estimated_time: f64,
}

/// `duration / speed_ratio` for every item with a positive duration.
/// Returns nothing for a non-positive ratio.
pub fn estimate_times<'a, I>(durations: I, speed_ratio: f64) -> BTreeMap<String, TimeEstimate>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    if !(speed_ratio.is_finite() && speed_ratio > 0.0) {
        return BTreeMap::new();
    }
    durations
        .into_iter()
        .filter(|(_, duration)| *duration > 0.0)
        .map(|(item, duration)| {
            (
                item.to_string(),
                TimeEstimate {
                    duration,
                    estimated_time: duration / speed_ratio,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_duration_items_are_excluded() {
        let estimates = estimate_times([("a", 120.0), ("b", 0.0), ("c", 60.0)], 2.0);

        assert_eq!(estimates.len(), 2);
        assert_relative_eq!(estimates["a"].estimated_time, 60.0);
        assert_relative_eq!(estimates["c"].estimated_time, 30.0);
        assert!(!estimates.contains_key("b"));
    }

    #[test]
    fn test_non_positive_ratio_gives_no_estimates() {
        assert!(estimate_times([("a", 120.0)], 0.0).is_empty());
        assert!(estimate_times([("a", 120.0)], -1.0).is_empty());
        assert!(estimate_times([("a", 120.0)], f64::NAN).is_empty());
    }

    #[test]
    fn test_duration_is_carried_through() {
        let estimates = estimate_times([("a", 90.0)], 3.0);
        assert_relative_eq!(estimates["a"].duration, 90.0);
        assert_relative_eq!(estimates["a"].estimated_time, 30.0);
    }
}
