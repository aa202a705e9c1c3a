/// Lock-free result counters shared by every scan worker.
use crate::model::{EncodingLabel, ScanResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One atomic counter per label plus skipped and total.
///
/// Exact under any number of concurrent callers. A [`snapshot`] is only
/// consistent once every worker has joined.
///
/// [`snapshot`]: ResultAggregator::snapshot
#[derive(Debug, Default)]
pub struct ResultAggregator {
    counts: [AtomicU64; EncodingLabel::COUNT],
    skipped: AtomicU64,
    total: AtomicU64,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classified file.
    #[inline]
    pub fn increment(&self, label: EncodingLabel) {
        self.counts[label.index()].fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file that was empty at read time or could not be read.
    #[inline]
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the counters into a [`ScanResult`]; zero counts are omitted.
    pub fn snapshot(&self, directories: u64, duration: Duration) -> ScanResult {
        let counts: BTreeMap<EncodingLabel, u64> = EncodingLabel::ALL
            .iter()
            .filter_map(|&label| {
                let n = self.counts[label.index()].load(Ordering::Acquire);
                (n > 0).then_some((label, n))
            })
            .collect();

        ScanResult {
            counts,
            skipped: self.skipped.load(Ordering::Acquire),
            total: self.total.load(Ordering::Acquire),
            directories,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_omits_zero_counts() {
        let agg = ResultAggregator::new();
        agg.increment(EncodingLabel::Ascii);
        agg.increment(EncodingLabel::Ascii);
        agg.increment(EncodingLabel::Koi8R);
        agg.record_skipped();

        let result = agg.snapshot(1, Duration::ZERO);
        assert_eq!(result.counts.len(), 2);
        assert_eq!(result.count(EncodingLabel::Ascii), 2);
        assert_eq!(result.count(EncodingLabel::Koi8R), 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.total, 4);
        assert!(result.is_consistent());
    }

    /// K threads × N increments of one label must sum exactly to K×N.
    #[test]
    fn concurrent_increments_are_exact() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 10_000;
        let agg = ResultAggregator::new();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let agg = &agg;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        agg.increment(EncodingLabel::Cp1251);
                        if t == 0 && i % 100 == 0 {
                            agg.record_skipped();
                        }
                    }
                });
            }
        });

        let result = agg.snapshot(0, Duration::ZERO);
        assert_eq!(result.count(EncodingLabel::Cp1251), THREADS * PER_THREAD);
        assert_eq!(result.skipped, PER_THREAD / 100);
        assert!(result.is_consistent());
    }
}
