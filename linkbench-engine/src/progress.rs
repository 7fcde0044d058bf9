//! Progress of the request phase, aggregated over all requesters.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Number of requests a requester completes before reporting them.
pub const REPORT_INTERVAL: u64 = 250;

/// Progress is logged whenever the total crosses a multiple of this interval.
pub const PRINT_INTERVAL: u64 = 10_000;

/// A snapshot of the aggregated progress, produced when a progress line is due.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressReport {
    /// Requests completed by all requesters.
    pub done: u64,
    /// Requests expected from all requesters.
    pub total: u64,
    /// Seconds since the timer started.
    pub elapsed_secs: f64,
    /// The configured time limit in seconds.
    pub time_limit_secs: u64,
}

impl ProgressReport {
    /// Percentage of requests completed.
    pub fn percent_done(&self) -> f64 {
        match self.total {
            0 => 100.0,
            total => self.done as f64 * 100.0 / total as f64,
        }
    }

    /// Requests per second since the timer started.
    pub fn rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.done as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Percentage of the time limit consumed.
    pub fn percent_time(&self) -> f64 {
        match self.time_limit_secs {
            0 => 0.0,
            limit => self.elapsed_secs * 100.0 / limit as f64,
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} requests finished: {:.1}% complete at {:.1} ops/sec {:.1}/{} secs elapsed: {:.1}% of time limit used",
            self.done,
            self.total,
            self.percent_done(),
            self.rate(),
            self.elapsed_secs,
            self.time_limit_secs,
            self.percent_time(),
        )
    }
}

/// Counts completed requests of all requesters.
///
/// Requesters report in batches of [`REPORT_INTERVAL`], so the shared counter is touched rarely.
#[derive(Debug)]
pub struct RequestProgress {
    total: u64,
    time_limit: Duration,
    done: AtomicU64,
    start: OnceLock<Instant>,
}

impl RequestProgress {
    /// Creates a counter expecting `total` requests within `time_limit`.
    pub fn new(total: u64, time_limit: Duration) -> Self {
        Self {
            total,
            time_limit,
            done: AtomicU64::new(0),
            start: OnceLock::new(),
        }
    }

    /// Starts the timer. Later calls have no effect.
    pub fn start_timer(&self) {
        self.start.get_or_init(Instant::now);
    }

    /// Returns the number of completed requests.
    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    /// Returns the number of expected requests.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Adds `increment` completed requests.
    ///
    /// Returns a report, which is also logged, if the new total crosses a multiple of
    /// [`PRINT_INTERVAL`] or reaches the expected total.
    pub fn update(&self, increment: u64) -> Option<ProgressReport> {
        if increment == 0 {
            return None;
        }

        let previous = self.done.fetch_add(increment, Ordering::Relaxed);
        let done = previous + increment;
        let crossed = previous / PRINT_INTERVAL != done / PRINT_INTERVAL;
        if !crossed && done != self.total {
            return None;
        }

        let start = *self.start.get_or_init(Instant::now);
        let report = ProgressReport {
            done,
            total: self.total,
            elapsed_secs: start.elapsed().as_secs_f64(),
            time_limit_secs: self.time_limit.as_secs(),
        };
        tracing::info!("{report}");
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_on_interval_crossings() {
        let progress = RequestProgress::new(25_000, Duration::from_secs(60));
        progress.start_timer();

        let mut reports = Vec::new();
        for _ in 0..100 {
            reports.extend(progress.update(REPORT_INTERVAL));
        }

        let done: Vec<_> = reports.iter().map(|r| r.done).collect();
        assert_eq!(done, [10_000, 20_000, 25_000]);
        assert_eq!(progress.done(), 25_000);
    }

    #[test]
    fn reports_when_batch_skips_interval() {
        let progress = RequestProgress::new(1_000_000, Duration::ZERO);
        assert!(progress.update(9_999).is_none());
        let report = progress.update(3).unwrap();
        assert_eq!(report.done, 10_002);
        assert!(progress.update(0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn report_measures_elapsed_time() {
        let progress = RequestProgress::new(500, Duration::from_secs(100));
        progress.start_timer();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let report = progress.update(500).unwrap();
        assert_eq!(report.percent_done(), 100.0);
        assert!((report.rate() - 50.0).abs() < 0.5);
        assert!((report.percent_time() - 10.0).abs() < 0.1);
        assert!(report.to_string().starts_with("500/500 requests finished: 100.0% complete"));
    }
}
