//! Runs the request phase with many concurrent requesters.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RequestConfig;
use crate::error::RequesterError;
use crate::progress::RequestProgress;
use crate::requester::{Requester, RequesterReport, RequesterState};
use crate::stats::LatencyStats;
use crate::store::Stores;

/// The outcome of a request phase.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Reports of all requesters, ordered by requester index.
    pub requesters: Vec<RequesterReport>,
    /// Wall-clock duration of the request phase.
    pub elapsed: Duration,
}

impl RunReport {
    /// Requests issued by all requesters.
    pub fn requests_done(&self) -> u64 {
        self.requesters.iter().map(|r| r.requests_done).sum()
    }

    /// Failed requests of all requesters.
    pub fn errors(&self) -> u64 {
        self.requesters.iter().map(|r| r.errors).sum()
    }

    /// Returns the number of requesters that ended in `state`.
    pub fn count_in(&self, state: RequesterState) -> usize {
        self.requesters.iter().filter(|r| r.state == state).count()
    }
}

/// Runs `requesters` concurrent requesters against `stores` until all of them stopped.
///
/// All requesters are created before any of them starts, so configuration errors are reported
/// without issuing a single request. Requester `i` seeds its random number generator from `seed`
/// and `i`, so repeated runs issue the same operations.
pub async fn run(
    config: &RequestConfig,
    stores: Stores,
    requesters: usize,
    seed: u64,
    latency: Arc<dyn LatencyStats>,
) -> Result<RunReport, RequesterError> {
    let total = config.requests.saturating_mul(requesters as u64);
    let progress = Arc::new(RequestProgress::new(total, config.max_time));

    let workers = (0..requesters)
        .map(|requester| {
            Requester::new(
                config,
                stores.clone(),
                Arc::clone(&latency),
                Arc::clone(&progress),
                requester,
                requesters,
                seed,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(requesters, requests = total, "starting request phase");
    let started = Instant::now();
    progress.start_timer();

    let tasks: Vec<_> = workers
        .into_iter()
        .map(|worker| tokio::spawn(worker.run()))
        .collect();

    let mut reports = Vec::with_capacity(requesters);
    for task in futures::future::join_all(tasks).await {
        reports.push(task??);
    }

    let report = RunReport {
        requesters: reports,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        requests = report.requests_done(),
        errors = report.errors(),
        aborted = report.count_in(RequesterState::Aborted),
        elapsed = ?report.elapsed,
        "request phase finished"
    );
    Ok(report)
}
