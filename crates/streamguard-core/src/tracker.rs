use std::collections::VecDeque;

/// Sliding-window failure counter over explicit millisecond timestamps.
///
/// A timestamp `t` is inside the window ending at `now` iff `now - window_ms < t`,
/// so a failure recorded exactly `window_ms` ago no longer counts. The window
/// never ends before the newest retained failure: a `now` older than that is
/// evaluated as the newest one, so a late timestamp that is already stale is
/// dropped on arrival. Stale entries are dropped on every write and read; there
/// is no background timer.
#[derive(Debug, Clone)]
pub struct FailureWindowTracker {
    window_ms: i64,
    // chronological, oldest first
    failures: VecDeque<i64>,
}

impl FailureWindowTracker {
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms, failures: VecDeque::new() }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Record one failure at `now_ms`, then purge everything outside the window.
    pub fn record_failure(&mut self, now_ms: i64) {
        match self.failures.back() {
            Some(&last) if now_ms < last => {
                // late arrival from a racing caller; keep the sequence sorted
                let at = self.failures.partition_point(|&t| t <= now_ms);
                self.failures.insert(at, now_ms);
            }
            _ => self.failures.push_back(now_ms),
        }
        self.purge(now_ms);
    }

    /// Number of failures inside the window ending at `now_ms`.
    pub fn count_in_window(&mut self, now_ms: i64) -> usize {
        self.purge(now_ms);
        self.failures.len()
    }

    fn purge(&mut self, now_ms: i64) {
        let end = self.failures.back().map_or(now_ms, |&newest| newest.max(now_ms));
        let cutoff = end.saturating_sub(self.window_ms);
        while let Some(&oldest) = self.failures.front() {
            if oldest > cutoff {
                break;
            }
            self.failures.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_failures_inside_window() {
        let mut t = FailureWindowTracker::new(10_000);
        t.record_failure(0);
        t.record_failure(4_000);
        t.record_failure(9_000);
        assert_eq!(t.count_in_window(9_000), 3);
    }

    #[test]
    fn lower_bound_is_exclusive() {
        let mut t = FailureWindowTracker::new(1_000);
        t.record_failure(0);
        assert_eq!(t.count_in_window(999), 1);
        assert_eq!(t.count_in_window(1_000), 0);
    }

    #[test]
    fn purge_is_idempotent() {
        let mut t = FailureWindowTracker::new(1_000);
        t.record_failure(0);
        t.record_failure(600);
        t.record_failure(900);
        let first = t.count_in_window(1_500);
        let second = t.count_in_window(1_500);
        assert_eq!(first, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn record_purges_stale_entries() {
        let mut t = FailureWindowTracker::new(100);
        t.record_failure(0);
        t.record_failure(50);
        t.record_failure(200);
        assert_eq!(t.failures.len(), 1);
    }

    #[test]
    fn out_of_order_failures_stay_sorted() {
        let mut t = FailureWindowTracker::new(10_000);
        t.record_failure(500);
        t.record_failure(100);
        t.record_failure(300);
        assert_eq!(t.failures.iter().copied().collect::<Vec<_>>(), vec![100, 300, 500]);
        assert_eq!(t.count_in_window(10_250), 2);
    }

    #[test]
    fn stale_late_arrival_is_dropped() {
        let mut t = FailureWindowTracker::new(100);
        t.record_failure(150);
        t.record_failure(10);
        assert_eq!(t.failures.iter().copied().collect::<Vec<_>>(), vec![150]);
        // an older `now` cannot pull the window back before the newest failure
        assert_eq!(t.count_in_window(10), 1);
    }

    #[test]
    fn late_arrival_inside_window_is_kept() {
        let mut t = FailureWindowTracker::new(100);
        t.record_failure(150);
        t.record_failure(60);
        assert_eq!(t.count_in_window(150), 2);
        assert_eq!(t.count_in_window(160), 1);
    }

    #[test]
    fn widely_spaced_failures_never_accumulate() {
        let mut t = FailureWindowTracker::new(1_000);
        for i in 0..20 {
            let now = i * 1_001;
            t.record_failure(now);
            assert_eq!(t.count_in_window(now), 1);
        }
    }
}
