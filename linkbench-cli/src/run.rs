//! Runs the request phase and prints a report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use bytes::Bytes;
use linkbench_engine::id_selector::Id2Chooser;
use linkbench_engine::{
    InMemoryStore, LatencyHistograms, NodeStore, OperationSummary, RequestConfig, RunReport,
    Stores,
};
use linkbench_types::{ID1_TYPE, ID2_TYPE, LINK_TYPE, Link, Node, OperationKind};
use yansi::Paint;

use crate::config::Config;

/// Runs all requesters against a fresh in-memory store.
pub async fn run(config: Config) -> Result<()> {
    let store = Arc::new(InMemoryStore::new(config.range_limit));
    if config.preload {
        preload(&store, &config.workload).await?;
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, requesters = config.requesters, "running request phase");

    let latency = Arc::new(LatencyHistograms::new());
    let report = linkbench_engine::run(
        &config.workload,
        Stores::shared(store),
        config.requesters,
        seed,
        latency.clone(),
    )
    .await
    .context("failed to run request phase")?;

    print_report(&report, &config.workload);
    print_latencies(&latency.summary(), report.elapsed);
    Ok(())
}

/// Populates the store with the links and nodes the request phase expects to exist.
async fn preload(store: &InMemoryStore, config: &RequestConfig) -> Result<()> {
    let start_id = config.start_id();
    let chooser = Id2Chooser::new(start_id, config.max_id, config.id2_fanout, 1, 0);
    let data = Bytes::from(vec![b'a'; config.link_data_size.as_u64() as usize]);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64);

    for id1 in start_id..config.max_id {
        for index in 0..i64::from(config.id2_fanout) {
            store.insert_link(Link {
                id1,
                id2: chooser.existing(id1, index),
                link_type: LINK_TYPE,
                id1_type: ID1_TYPE,
                id2_type: ID2_TYPE,
                data: data.clone(),
                time: now - index,
                ..Default::default()
            });
        }
    }

    let node = Node::unassigned(ID1_TYPE, Bytes::from_static(&[0; 512]));
    for _ in start_id..config.max_id {
        store
            .add_node(&config.dbid, &node)
            .await
            .context("failed to preload nodes")?;
    }

    tracing::info!(
        links = store.link_count(),
        nodes = store.node_count(),
        "preloaded store"
    );
    Ok(())
}

fn print_report(report: &RunReport, config: &RequestConfig) {
    let secs = report.elapsed.as_secs_f64();
    let requests = report.requests_done();

    println!();
    println!(
        "{} ({} requesters, {} requests, payload: {})",
        "## REQUEST PHASE".bold(),
        report.requesters.len().bold(),
        requests.bold(),
        config.link_data_size,
    );
    println!(
        "  {:.2} requests/s; {} errors; {:.2?} elapsed",
        (requests as f64 / secs.max(f64::EPSILON)).bold(),
        report.errors().red(),
        report.elapsed,
    );

    for requester in &report.requesters {
        println!(
            "  requester #{}: {:?}, {} requests, {} errors, found: {}, not found: {}",
            requester.requester.blue(),
            requester.state,
            requester.requests_done,
            requester.errors,
            requester.found,
            requester.not_found,
        );
    }
}

fn print_latencies(summary: &BTreeMap<OperationKind, OperationSummary>, elapsed: Duration) {
    println!();
    println!("{}", "## LATENCIES".bold());

    for (kind, ops) in summary {
        let ops_ps = ops.count as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        println!(
            "  {:<16} {:>10} ops  {:>10.2} ops/s  avg: {:.2?}; p50: {:.2?}; p90: {:.2?}; p99: {:.2?}; max: {:.2?}",
            kind.bold(),
            ops.count,
            ops_ps,
            micros(ops.mean),
            micros(ops.p50),
            micros(ops.p90),
            micros(ops.p99),
            micros(ops.max),
        );
    }
}

fn micros(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0) / 1e6)
}
