//! Leak detection via linear trend analysis.
//!
//! A leak is sustained growth, not a spike: the trailing window must
//! show both a substantial positive slope and a high Pearson correlation
//! before detection fires.

use memwatch_types::{Alert, MemorySample, Trend};

use crate::history::SampleHistory;

/// Trailing window evaluated for leaks.
pub const LEAK_WINDOW: usize = 15;

/// Minimum samples before leak detection is meaningful.
pub const MIN_LEAK_SAMPLES: usize = 10;

/// Minimum heap growth per sample to count as substantial: 1 MiB.
pub const MIN_GROWTH_PER_SAMPLE: f64 = 1024.0 * 1024.0;

/// Minimum Pearson correlation to count as consistent growth.
pub const MIN_CORRELATION: f64 = 0.9;

/// Ordinary least-squares trend of `heap_used` against sample index,
/// plus the Pearson correlation of the same series.
///
/// Degenerate inputs - fewer than two samples, or zero variance in
/// `heap_used` - return [`Trend::ZERO`] rather than NaN.
pub fn trend(samples: &[MemorySample]) -> Trend {
    let n = samples.len();
    if n < 2 {
        return Trend::ZERO;
    }

    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = samples.iter().map(|s| s.heap_used as f64).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (i, sample) in samples.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = sample.heap_used as f64 - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Trend::ZERO;
    }

    Trend {
        slope: cov / var_x,
        correlation: cov / (var_x * var_y).sqrt(),
    }
}

/// Classifies sustained heap growth over a trailing sample window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakDetector {
    /// Size of the trailing window.
    pub window: usize,

    /// Minimum history length before evaluating at all.
    pub min_samples: usize,

    /// Growth floor, bytes per sample.
    pub min_slope: f64,

    /// Consistency floor.
    pub min_correlation: f64,
}

impl Default for LeakDetector {
    fn default() -> Self {
        Self {
            window: LEAK_WINDOW,
            min_samples: MIN_LEAK_SAMPLES,
            min_slope: MIN_GROWTH_PER_SAMPLE,
            min_correlation: MIN_CORRELATION,
        }
    }
}

impl LeakDetector {
    /// Evaluate the trailing window; `Some` when growth is both
    /// substantial and consistent.
    pub fn detect(&self, history: &SampleHistory) -> Option<Alert> {
        if history.len() < self.min_samples {
            return None;
        }
        let window = history.window(self.window);
        let trend = trend(&window);
        if trend.slope > self.min_slope && trend.correlation > self.min_correlation {
            Some(Alert::memory_leak(trend, window.len()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memwatch_types::{AlertKind, ResourceCounts};

    const MIB: u64 = 1024 * 1024;

    fn sample(heap_used: u64) -> MemorySample {
        MemorySample::with_timestamp(0, heap_used, heap_used * 2, heap_used, ResourceCounts::default())
    }

    fn history_of(heap_values: impl IntoIterator<Item = u64>) -> SampleHistory {
        let mut history = SampleHistory::new();
        for v in heap_values {
            history.push(sample(v));
        }
        history
    }

    #[test]
    fn constant_step_growth_has_positive_slope_and_high_correlation() {
        let samples: Vec<_> = (0..5u64).map(|i| sample(100 * MIB + i * 2 * MIB)).collect();
        let t = trend(&samples);
        assert!(t.slope > 0.0);
        assert!(t.correlation > 0.9);
        // Exact linear growth: slope is the step, correlation is 1.
        assert!((t.slope - 2.0 * MIB as f64).abs() < 1e-3);
        assert!((t.correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_two_samples_is_degenerate() {
        assert_eq!(trend(&[]), Trend::ZERO);
        assert_eq!(trend(&[sample(100)]), Trend::ZERO);
    }

    #[test]
    fn constant_heap_used_is_degenerate_not_nan() {
        let samples: Vec<_> = (0..10).map(|_| sample(50 * MIB)).collect();
        let t = trend(&samples);
        assert_eq!(t, Trend::ZERO);
        assert!(!t.slope.is_nan());
        assert!(!t.correlation.is_nan());
    }

    #[test]
    fn falling_heap_has_negative_slope() {
        let samples: Vec<_> = (0..10u64).map(|i| sample(100 * MIB - i * MIB)).collect();
        let t = trend(&samples);
        assert!(t.slope < 0.0);
        assert!(t.correlation < -0.9);
    }

    #[test]
    fn sustained_two_mib_growth_is_detected() {
        let history = history_of((0..15u64).map(|i| 100 * MIB + i * 2 * MIB));
        let detector = LeakDetector::default();
        let alert = detector.detect(&history).expect("leak should be detected");
        match alert.kind {
            AlertKind::MemoryLeakDetected { trend, window } => {
                assert!(trend.slope > MIN_GROWTH_PER_SAMPLE);
                assert!(trend.correlation > MIN_CORRELATION);
                assert_eq!(window, 15);
            }
            other => panic!("unexpected alert kind: {other:?}"),
        }
    }

    #[test]
    fn oscillation_without_sustained_growth_is_not_detected() {
        let history = history_of((0..15u64).map(|i| {
            if i % 2 == 0 {
                100 * MIB
            } else {
                104 * MIB
            }
        }));
        assert!(LeakDetector::default().detect(&history).is_none());
    }

    #[test]
    fn single_spike_is_not_detected() {
        let mut values = vec![100 * MIB; 14];
        values.push(200 * MIB);
        assert!(LeakDetector::default().detect(&history_of(values)).is_none());
    }

    #[test]
    fn slow_growth_below_floor_is_not_detected() {
        // Perfectly linear but only 1 KiB per sample.
        let history = history_of((0..15u64).map(|i| 100 * MIB + i * 1024));
        assert!(LeakDetector::default().detect(&history).is_none());
    }

    #[test]
    fn too_few_samples_reports_no_leak() {
        let history = history_of((0..5u64).map(|i| 100 * MIB + i * 4 * MIB));
        assert!(LeakDetector::default().detect(&history).is_none());
    }

    #[test]
    fn detection_uses_only_the_trailing_window() {
        // Flat for a long time, then strong growth in the last 15.
        let mut values: Vec<u64> = vec![100 * MIB; 50];
        values.extend((0..15u64).map(|i| 100 * MIB + i * 2 * MIB));
        assert!(LeakDetector::default().detect(&history_of(values)).is_some());
    }
}
