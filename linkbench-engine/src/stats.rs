//! Routing and aggregation of per-operation measurements.
//!
//! A [`StatsRecorder`] forwards every measurement of a requester to two sinks:
//!
//! - a [`SampledStats`] sink owned by the requester, which also receives non-latency samples such
//!   as the number of links returned by link-list reads
//! - a [`LatencyStats`] sink shared by all requesters, which only receives latencies of
//!   successful operations
//!
//! [`SketchStats`] and [`LatencyHistograms`] implement these sinks with DDSketches, so memory use
//! stays bounded regardless of the number of requests.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use linkbench_types::OperationKind;
use sketches_ddsketch::{Config as SketchConfig, DDSketch};
use tokio::time::Instant;

/// Relative accuracy of the sketches' quantiles.
const SKETCH_ALPHA: f64 = 0.01;
/// Smallest value distinguished from zero.
const SKETCH_MIN_VALUE: f64 = 1.0e-9;

/// Receives all samples of a single requester.
pub trait SampledStats: Debug + Send + Sync {
    /// Adds a sample for `kind`. For failed operations, `value` is the time until the failure.
    fn add_stats(&mut self, kind: OperationKind, value: u64, is_error: bool);

    /// Emits a summary of the given kinds.
    fn display_stats(&self, kinds: &[OperationKind]);
}

/// Receives the latencies of successful operations of all requesters.
pub trait LatencyStats: Debug + Send + Sync {
    /// Records the latency of an operation in microseconds.
    fn record_latency(&self, requester: usize, kind: OperationKind, micros: u64);
}

/// Aggregated samples of one operation kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationSummary {
    /// Number of successful samples.
    pub count: u64,
    /// Number of failed operations.
    pub errors: u64,
    /// Mean of all samples.
    pub mean: f64,
    /// Median sample.
    pub p50: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 99th percentile.
    pub p99: f64,
    /// Largest sample.
    pub max: f64,
}

impl OperationSummary {
    fn from_sketch(sketch: &DDSketch, errors: u64) -> Self {
        let count = sketch.count() as u64;
        let quantile = |q| sketch.quantile(q).ok().flatten().unwrap_or_default();
        Self {
            count,
            errors,
            mean: match count {
                0 => 0.0,
                n => sketch.sum().unwrap_or_default() / n as f64,
            },
            p50: quantile(0.5),
            p90: quantile(0.9),
            p99: quantile(0.99),
            max: sketch.max().unwrap_or_default(),
        }
    }
}

fn new_sketch(max_bins: u32) -> DDSketch {
    DDSketch::new(SketchConfig::new(SKETCH_ALPHA, max_bins, SKETCH_MIN_VALUE))
}

/// A [`SampledStats`] sink keeping one DDSketch per operation kind.
pub struct SketchStats {
    requester: usize,
    max_bins: u32,
    display_freq: Duration,
    last_display: Instant,
    sketches: BTreeMap<OperationKind, DDSketch>,
    errors: BTreeMap<OperationKind, u64>,
}

impl fmt::Debug for SketchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SketchStats")
            .field("requester", &self.requester)
            .field("max_bins", &self.max_bins)
            .field("display_freq", &self.display_freq)
            .field("kinds", &self.sketches.keys().collect::<Vec<_>>())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl SketchStats {
    /// Creates a sink for `requester`.
    ///
    /// Every `display_freq`, a summary of all samples so far is logged. `max_samples` bounds the
    /// number of sketch bins kept per operation kind.
    pub fn new(requester: usize, display_freq: Duration, max_samples: u32) -> Self {
        Self {
            requester,
            max_bins: max_samples.max(1),
            display_freq,
            last_display: Instant::now(),
            sketches: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Returns the aggregated samples of `kind`, if any were added.
    pub fn summary(&self, kind: OperationKind) -> Option<OperationSummary> {
        let errors = self.errors.get(&kind).copied().unwrap_or_default();
        match self.sketches.get(&kind) {
            Some(sketch) => Some(OperationSummary::from_sketch(sketch, errors)),
            None if errors > 0 => Some(OperationSummary {
                errors,
                ..Default::default()
            }),
            None => None,
        }
    }
}

impl SampledStats for SketchStats {
    fn add_stats(&mut self, kind: OperationKind, value: u64, is_error: bool) {
        if is_error {
            *self.errors.entry(kind).or_default() += 1;
        } else {
            let max_bins = self.max_bins;
            self.sketches
                .entry(kind)
                .or_insert_with(|| new_sketch(max_bins))
                .add(value as f64);
        }

        if !self.display_freq.is_zero() && self.last_display.elapsed() >= self.display_freq {
            self.display_stats(&OperationKind::REPORTED);
            self.last_display = Instant::now();
        }
    }

    fn display_stats(&self, kinds: &[OperationKind]) {
        for &kind in kinds {
            let Some(summary) = self.summary(kind) else {
                continue;
            };
            tracing::info!(
                requester = self.requester,
                kind = %kind,
                count = summary.count,
                errors = summary.errors,
                mean = summary.mean,
                p50 = summary.p50,
                p90 = summary.p90,
                p99 = summary.p99,
                max = summary.max,
                "operation stats"
            );
        }
    }
}

/// A [`LatencyStats`] sink shared by all requesters.
#[derive(Default)]
pub struct LatencyHistograms {
    sketches: Mutex<BTreeMap<(usize, OperationKind), DDSketch>>,
}

impl fmt::Debug for LatencyHistograms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyHistograms").finish_non_exhaustive()
    }
}

impl LatencyHistograms {
    /// Creates an empty set of histograms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the latency summary of one requester.
    pub fn requester_summary(&self, requester: usize) -> BTreeMap<OperationKind, OperationSummary> {
        let sketches = self.sketches.lock().unwrap();
        sketches
            .iter()
            .filter(|((r, _), _)| *r == requester)
            .map(|((_, kind), sketch)| (*kind, OperationSummary::from_sketch(sketch, 0)))
            .collect()
    }

    /// Returns the latency summary of all requesters combined.
    pub fn summary(&self) -> BTreeMap<OperationKind, OperationSummary> {
        let sketches = self.sketches.lock().unwrap();
        let mut merged: BTreeMap<OperationKind, DDSketch> = BTreeMap::new();
        for ((_, kind), sketch) in sketches.iter() {
            match merged.get_mut(kind) {
                Some(total) => {
                    if let Err(err) = total.merge(sketch) {
                        tracing::warn!(kind = %kind, "failed to merge latency sketch: {err}");
                    }
                }
                None => {
                    merged.insert(*kind, sketch.clone());
                }
            }
        }

        merged
            .into_iter()
            .map(|(kind, sketch)| (kind, OperationSummary::from_sketch(&sketch, 0)))
            .collect()
    }
}

impl LatencyStats for LatencyHistograms {
    fn record_latency(&self, requester: usize, kind: OperationKind, micros: u64) {
        self.sketches
            .lock()
            .unwrap()
            .entry((requester, kind))
            .or_default()
            .add(micros as f64);
    }
}

/// Routes the measurements of one requester to its sinks.
#[derive(Debug)]
pub struct StatsRecorder {
    requester: usize,
    sampled: Box<dyn SampledStats>,
    latency: Arc<dyn LatencyStats>,
}

impl StatsRecorder {
    /// Creates a recorder for `requester`.
    pub fn new(
        requester: usize,
        sampled: Box<dyn SampledStats>,
        latency: Arc<dyn LatencyStats>,
    ) -> Self {
        Self {
            requester,
            sampled,
            latency,
        }
    }

    /// Records the outcome of an operation that took `micros` microseconds.
    pub fn record(&mut self, kind: OperationKind, micros: u64, is_error: bool) {
        self.sampled.add_stats(kind, micros, is_error);
        if !is_error {
            self.latency.record_latency(self.requester, kind, micros);
        }
    }

    /// Records the number of links returned by a link-list read.
    pub fn record_range_size(&mut self, links: usize) {
        self.sampled
            .add_stats(OperationKind::RangeSize, links as u64, false);
    }

    /// Emits the final summary of all reported operation kinds.
    pub fn display(&self) {
        self.sampled.display_stats(&OperationKind::REPORTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct CountingLatency(Mutex<Vec<(usize, OperationKind, u64)>>);

    impl LatencyStats for CountingLatency {
        fn record_latency(&self, requester: usize, kind: OperationKind, micros: u64) {
            self.0.lock().unwrap().push((requester, kind, micros));
        }
    }

    #[test]
    fn errors_skip_latency_sink() {
        let latency = Arc::new(CountingLatency::default());
        let sampled = SketchStats::new(3, Duration::ZERO, 1024);
        let mut recorder = StatsRecorder::new(3, Box::new(sampled), latency.clone());

        recorder.record(OperationKind::AddLink, 120, false);
        recorder.record(OperationKind::AddLink, 900, true);
        recorder.record_range_size(17);

        assert_eq!(
            *latency.0.lock().unwrap(),
            [(3, OperationKind::AddLink, 120)]
        );
    }

    #[test]
    fn sketch_stats_summarize_per_kind() {
        let mut stats = SketchStats::new(0, Duration::ZERO, 1024);
        for micros in 1..=100 {
            stats.add_stats(OperationKind::GetNode, micros, false);
        }
        stats.add_stats(OperationKind::GetNode, 5_000, true);
        stats.add_stats(OperationKind::DeleteNode, 5_000, true);

        let summary = stats.summary(OperationKind::GetNode).unwrap();
        assert_eq!(summary.count, 100);
        assert_eq!(summary.errors, 1);
        assert!((summary.mean - 50.5).abs() < 1e-6);
        assert!((summary.p50 - 50.0).abs() <= 2.0);
        assert_eq!(summary.max, 100.0);

        let failed_only = stats.summary(OperationKind::DeleteNode).unwrap();
        assert_eq!(failed_only.count, 0);
        assert_eq!(failed_only.errors, 1);

        assert!(stats.summary(OperationKind::AddNode).is_none());
    }

    #[test]
    fn sinks_are_debug() {
        let mut stats = SketchStats::new(5, Duration::ZERO, 16);
        stats.add_stats(OperationKind::AddLink, 10, false);
        let histograms = LatencyHistograms::new();
        histograms.record_latency(0, OperationKind::AddLink, 10);

        assert!(format!("{stats:?}").starts_with("SketchStats { requester: 5"));
        assert!(format!("{histograms:?}").starts_with("LatencyHistograms"));
    }

    #[test]
    fn histograms_merge_requesters() {
        let histograms = LatencyHistograms::new();
        histograms.record_latency(0, OperationKind::CountLink, 10);
        histograms.record_latency(1, OperationKind::CountLink, 30);
        histograms.record_latency(1, OperationKind::AddLink, 50);

        let total = histograms.summary();
        assert_eq!(total[&OperationKind::CountLink].count, 2);
        assert_eq!(total[&OperationKind::AddLink].count, 1);

        let second = histograms.requester_summary(1);
        assert_eq!(second[&OperationKind::CountLink].count, 1);
    }
}
