//! Open-loop request pacing.
//!
//! Requests are issued as a Poisson process: the gaps between issue times are exponentially
//! distributed with the target rate as parameter. The average throughput matches the target rate
//! while requests still arrive in realistic bursts. Issue times are derived from the previous
//! *scheduled* issue time rather than from the completion of the previous request, so a slow
//! request does not lower the offered load.

use std::time::Duration;

use rand::RngCore;
use rand_distr::{Distribution, Exp};
use tokio::time::Instant;

/// Paces requests to a target rate.
#[derive(Debug)]
pub struct RateLimiter {
    /// Inter-arrival gaps in nanoseconds, `None` if pacing is disabled.
    interarrival: Option<Exp<f64>>,
    /// The point in time issue times are measured from.
    origin: Instant,
    /// The issue time of the previous request, in nanoseconds since `origin`.
    last_issue_ns: f64,
}

impl RateLimiter {
    /// Creates a limiter issuing `requests_per_sec` on average, starting now.
    ///
    /// A rate of zero or less disables pacing.
    pub fn new(requests_per_sec: f64) -> Self {
        let rate_ns = requests_per_sec / 1e9;
        let interarrival = if rate_ns > 0.0 {
            Exp::new(rate_ns).ok()
        } else {
            None
        };

        Self {
            interarrival,
            origin: Instant::now(),
            last_issue_ns: 0.0,
        }
    }

    /// Returns `true` if requests are paced.
    pub fn is_enabled(&self) -> bool {
        self.interarrival.is_some()
    }

    /// Returns the issue time following `previous_ns`, both in nanoseconds since the origin.
    pub fn next_issue_time(&self, rng: &mut dyn RngCore, previous_ns: f64) -> f64 {
        match &self.interarrival {
            Some(exp) => previous_ns + exp.sample(rng),
            None => previous_ns,
        }
    }

    /// Waits until the given issue time, in nanoseconds since the origin.
    ///
    /// Returns immediately if that time has already passed.
    pub async fn wait_until(&self, issue_ns: f64) {
        let deadline = self.origin + Duration::from_nanos(issue_ns as u64);
        tokio::time::sleep_until(deadline).await;
    }

    /// Schedules the next request and waits until it is due.
    pub async fn pace<R: RngCore>(&mut self, rng: &mut R) {
        if !self.is_enabled() {
            return;
        }

        self.last_issue_ns = self.next_issue_time(rng, self.last_issue_ns);
        self.wait_until(self.last_issue_ns).await;
    }
}
