//! Run-wide progress accounting
//!
//! Each worker owns one counter slot and bumps it once per processed record.
//! The overall figure is global completion, `100 * sum(slots) / total`, which
//! only grows. The tracker forwards a value to its observer only when it is
//! higher than the last one forwarded, so observers see a non-decreasing
//! sequence even when workers race.

use crate::progress::ProgressObserver;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Per-worker completion counters plus the emitter
pub struct ProgressTracker {
    slots: Vec<AtomicU64>,
    total: u64,
    emitted: AtomicU8,
    emit_lock: Mutex<()>,
    observer: Arc<dyn ProgressObserver>,
}

impl ProgressTracker {
    /// Tracker for `workers` slots over `total` expected records
    pub fn new(workers: usize, total: u64, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            slots: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            total,
            emitted: AtomicU8::new(0),
            emit_lock: Mutex::new(()),
            observer,
        }
    }

    /// Handle for worker `index`; the only way to write its slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a slot of this tracker.
    pub fn slot(self: &Arc<Self>, index: usize) -> ProgressSlot {
        assert!(index < self.slots.len(), "no progress slot {}", index);
        ProgressSlot {
            tracker: Arc::clone(self),
            index,
        }
    }

    /// Records processed across all workers
    pub fn done(&self) -> u64 {
        self.slots.iter().map(|slot| slot.load(Ordering::SeqCst)).sum()
    }

    /// Records processed by one worker
    pub fn done_by(&self, index: usize) -> u64 {
        self.slots
            .get(index)
            .map(|slot| slot.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Overall completion, 0..=100
    pub fn percent(&self) -> u8 {
        completion_percent(self.done(), self.total)
    }

    fn record(&self, index: usize, records: u64) {
        self.slots[index].fetch_add(records, Ordering::SeqCst);

        let percent = self.percent();
        if percent <= self.emitted.load(Ordering::Acquire) {
            return;
        }

        let _guard = self.emit_lock.lock().unwrap_or_else(|e| e.into_inner());
        if percent > self.emitted.load(Ordering::Acquire) {
            self.observer.on_progress(percent);
            self.emitted.store(percent, Ordering::Release);
        }
    }
}

/// Write handle for a single worker's progress slot
pub struct ProgressSlot {
    tracker: Arc<ProgressTracker>,
    index: usize,
}

impl ProgressSlot {
    /// Count `records` more records as processed by this worker
    pub fn record(&self, records: u64) {
        self.tracker.record(self.index, records);
    }
}

/// `100 * done / total`, clamped to 100. An empty run is complete.
pub fn completion_percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }

    let percent = (u128::from(done) * 100 / u128::from(total)).min(100);
    percent as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u8>>,
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&self, percent: u8) {
            self.seen.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn test_completion_percent() {
        assert_eq!(completion_percent(0, 2500), 0);
        assert_eq!(completion_percent(1250, 2500), 50);
        assert_eq!(completion_percent(2499, 2500), 99);
        assert_eq!(completion_percent(2500, 2500), 100);
        assert_eq!(completion_percent(0, 0), 100);
    }

    #[test]
    fn test_completion_percent_clamps_overshoot() {
        // The source may return more rows than its reported count.
        assert_eq!(completion_percent(3000, 2500), 100);
    }

    #[test]
    fn test_slots_are_independent() {
        let recorder = Arc::new(Recorder::default());
        let tracker = Arc::new(ProgressTracker::new(3, 10, recorder.clone()));

        tracker.slot(0).record(2);
        tracker.slot(2).record(3);

        assert_eq!(tracker.done_by(0), 2);
        assert_eq!(tracker.done_by(1), 0);
        assert_eq!(tracker.done_by(2), 3);
        assert_eq!(tracker.done(), 5);
        assert_eq!(tracker.percent(), 50);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![20, 50]);
    }

    #[test]
    fn test_unchanged_percent_is_not_reemitted() {
        let recorder = Arc::new(Recorder::default());
        let tracker = Arc::new(ProgressTracker::new(1, 1000, recorder.clone()));
        let slot = tracker.slot(0);

        for _ in 0..1000 {
            slot.record(1);
        }

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 100);
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_emitted_sequence_is_monotonic_under_contention() {
        let recorder = Arc::new(Recorder::default());
        let workers = 8;
        let per_worker = 1250;
        let tracker = Arc::new(ProgressTracker::new(
            workers,
            (workers * per_worker) as u64,
            recorder.clone(),
        ));

        let handles: Vec<_> = (0..workers)
            .map(|w| {
                let slot = tracker.slot(w);
                std::thread::spawn(move || {
                    for _ in 0..per_worker {
                        slot.record(1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let seen = recorder.seen.lock().unwrap();
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", seen);
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(tracker.done(), (workers * per_worker) as u64);
    }

    #[test]
    #[should_panic(expected = "no progress slot")]
    fn test_slot_out_of_range() {
        let tracker = Arc::new(ProgressTracker::new(2, 10, Arc::new(Recorder::default())));
        let _ = tracker.slot(2);
    }
}
