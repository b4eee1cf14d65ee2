//! Bucketed rolling window of call outcomes.
//!
//! The window is split into `bucket_count` buckets of equal span. Buckets older than the
//! window are discarded as time advances, so the totals only ever reflect recent calls.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Failure,
    Timeout,
    Rejection,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started_at: Instant,
    successes: u64,
    failures: u64,
    timeouts: u64,
    rejections: u64,
}

impl Bucket {
    fn new(started_at: Instant) -> Self {
        Self {
            started_at,
            successes: 0,
            failures: 0,
            timeouts: 0,
            rejections: 0,
        }
    }
}

/// Aggregated counts over the live buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WindowTotals {
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub rejections: u64,
}

impl WindowTotals {
    /// Calls that actually reached the operation
    pub fn volume(&self) -> u64 {
        self.successes + self.failures + self.timeouts
    }

    /// Failures including timeouts
    pub fn errors(&self) -> u64 {
        self.failures + self.timeouts
    }

    pub fn error_percentage(&self) -> f64 {
        let volume = self.volume();
        if volume == 0 {
            return 0.0;
        }
        self.errors() as f64 * 100.0 / volume as f64
    }

    /// True once errors reach `threshold` percent of a volume of at least `min_volume`
    pub fn exceeds(&self, threshold: u8, min_volume: u64) -> bool {
        let volume = self.volume();
        if volume == 0 || volume < min_volume {
            return false;
        }
        self.errors() * 100 >= u64::from(threshold) * volume
    }
}

#[derive(Debug)]
pub(crate) struct RollingWindow {
    buckets: VecDeque<Bucket>,
    bucket_span: Duration,
    bucket_count: usize,
}

impl RollingWindow {
    pub fn new(window: Duration, bucket_count: u32) -> Self {
        let bucket_count = bucket_count.max(1) as usize;
        let bucket_span = (window / bucket_count as u32).max(Duration::from_millis(1));
        Self {
            buckets: VecDeque::with_capacity(bucket_count),
            bucket_span,
            bucket_count,
        }
    }

    pub fn record(&mut self, outcome: Outcome, now: Instant) {
        let bucket = self.current_bucket(now);
        match outcome {
            Outcome::Success => bucket.successes += 1,
            Outcome::Failure => bucket.failures += 1,
            Outcome::Timeout => bucket.timeouts += 1,
            Outcome::Rejection => bucket.rejections += 1,
        }
    }

    pub fn totals(&mut self, now: Instant) -> WindowTotals {
        self.evict(now);
        self.buckets
            .iter()
            .fold(WindowTotals::default(), |mut totals, bucket| {
                totals.successes += bucket.successes;
                totals.failures += bucket.failures;
                totals.timeouts += bucket.timeouts;
                totals.rejections += bucket.rejections;
                totals
            })
    }

    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    fn current_bucket(&mut self, now: Instant) -> &mut Bucket {
        self.evict(now);
        let needs_new = match self.buckets.back() {
            Some(bucket) => now.saturating_duration_since(bucket.started_at) >= self.bucket_span,
            None => true,
        };
        if needs_new {
            if self.buckets.len() == self.bucket_count {
                self.buckets.pop_front();
            }
            self.buckets.push_back(Bucket::new(now));
        }
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }

    fn evict(&mut self, now: Instant) {
        let window = self.bucket_span * self.bucket_count as u32;
        while let Some(front) = self.buckets.front() {
            if now.saturating_duration_since(front.started_at) >= window {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate_within_window() {
        let start = Instant::now();
        let mut window = RollingWindow::new(Duration::from_secs(10), 10);

        window.record(Outcome::Success, start);
        window.record(Outcome::Failure, start + Duration::from_millis(500));
        window.record(Outcome::Timeout, start + Duration::from_secs(2));
        window.record(Outcome::Rejection, start + Duration::from_secs(3));

        let totals = window.totals(start + Duration::from_secs(3));
        assert_eq!(totals.successes, 1);
        assert_eq!(totals.failures, 1);
        assert_eq!(totals.timeouts, 1);
        assert_eq!(totals.rejections, 1);
        assert_eq!(totals.volume(), 3);
        assert_eq!(totals.errors(), 2);
    }

    #[test]
    fn test_old_buckets_fall_out_of_window() {
        let start = Instant::now();
        let mut window = RollingWindow::new(Duration::from_secs(1), 4);

        window.record(Outcome::Failure, start);
        window.record(Outcome::Failure, start);
        window.record(Outcome::Success, start + Duration::from_millis(800));

        let totals = window.totals(start + Duration::from_millis(1100));
        assert_eq!(totals.failures, 0);
        assert_eq!(totals.successes, 1);

        let totals = window.totals(start + Duration::from_secs(5));
        assert_eq!(totals, WindowTotals::default());
    }

    #[test]
    fn test_threshold_respects_volume() {
        let totals = WindowTotals {
            successes: 19,
            failures: 1,
            timeouts: 0,
            rejections: 0,
        };
        assert!(totals.exceeds(5, 0));
        assert!(!totals.exceeds(6, 0));
        assert!(!totals.exceeds(5, 21));
        assert_eq!(totals.error_percentage(), 5.0);
        assert!(!WindowTotals::default().exceeds(0, 0));
    }

    #[test]
    fn test_reset_clears_counts() {
        let now = Instant::now();
        let mut window = RollingWindow::new(Duration::from_secs(10), 10);
        window.record(Outcome::Failure, now);
        window.reset();
        assert_eq!(window.totals(now).volume(), 0);
    }
}
