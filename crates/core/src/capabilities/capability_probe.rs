use std::sync::{Mutex, PoisonError};

use super::domain::capability_detector::CapabilityDetector;
use super::domain::tool_capabilities::ToolCapabilities;

/// Compute-once cache of the tool's capabilities.
///
/// The first call to [`CapabilityProbe::get`] runs the detector; later calls
/// return the stored value. Concurrent first callers wait on the lock, so the
/// detector runs once.
pub struct CapabilityProbe {
    detector: Box<dyn CapabilityDetector>,
    cached: Mutex<Option<ToolCapabilities>>,
}

impl CapabilityProbe {
    pub fn new(detector: Box<dyn CapabilityDetector>) -> Self {
        Self {
            detector,
            cached: Mutex::new(None),
        }
    }

    /// A probe pre-seeded with `capabilities`; the detector is never run.
    pub fn fixed(capabilities: ToolCapabilities) -> Self {
        Self {
            detector: Box::new(Fixed(capabilities)),
            cached: Mutex::new(Some(capabilities)),
        }
    }

    pub fn get(&self) -> ToolCapabilities {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(capabilities) = *cached {
            return capabilities;
        }
        let capabilities = self.detector.detect();
        log::info!(
            "Tool capabilities: installed={} word_timestamps={} highlight_words={}",
            capabilities.installed,
            capabilities.word_timestamps_available,
            capabilities.highlight_words_available
        );
        *cached = Some(capabilities);
        capabilities
    }

    /// Forget the cached value so the next `get` detects again.
    pub fn reset(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

struct Fixed(ToolCapabilities);

impl CapabilityDetector for Fixed {
    fn detect(&self) -> ToolCapabilities {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    struct CountingDetector {
        calls: Arc<AtomicUsize>,
        result: ToolCapabilities,
    }

    impl CapabilityDetector for CountingDetector {
        fn detect(&self) -> ToolCapabilities {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    fn counting(result: ToolCapabilities) -> (CapabilityProbe, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = CapabilityProbe::new(Box::new(CountingDetector {
            calls: calls.clone(),
            result,
        }));
        (probe, calls)
    }

    fn supported() -> ToolCapabilities {
        ToolCapabilities {
            word_timestamps_available: true,
            highlight_words_available: true,
            installed: true,
        }
    }

    #[test]
    fn test_second_get_does_not_redetect() {
        let (probe, calls) = counting(supported());

        let first = probe.get();
        let second = probe.get();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unavailable_result_is_cached_too() {
        let (probe, calls) = counting(ToolCapabilities::unavailable());

        assert!(!probe.get().installed);
        assert!(!probe.get().installed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_forces_redetect() {
        let (probe, calls) = counting(supported());
        probe.get();
        probe.reset();
        probe.get();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_calls_detect_once() {
        let (probe, calls) = counting(supported());
        let probe = Arc::new(probe);
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let probe = probe.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    probe.get()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), supported());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fixed_returns_seeded_value() {
        let probe = CapabilityProbe::fixed(supported());
        assert_eq!(probe.get(), supported());
        probe.reset();
        assert_eq!(probe.get(), supported());
    }
}
