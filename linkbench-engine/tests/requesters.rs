//! End-to-end runs of the request phase against the in-memory store.
//!
//! These tests inspect the sequence of store calls recorded by the store to assert which
//! operations requesters issue, and in which order.

use std::sync::Arc;
use std::time::Duration;

use linkbench_engine::distribution::AccessConfig;
use linkbench_engine::selector::OperationMix;
use linkbench_engine::store::StoreCall;
use linkbench_engine::{
    ConfigError, InMemoryStore, LatencyHistograms, RequestConfig, RequesterError, RequesterState,
    RunReport, Stores,
};
use linkbench_types::{LINK_TYPE, Link, OperationKind};

fn links_only(mix: OperationMix) -> RequestConfig {
    RequestConfig {
        requests: 1_000,
        max_time: Duration::ZERO,
        max_id: 101,
        operations: mix,
        node_access: None,
        display_freq: Duration::ZERO,
        ..Default::default()
    }
}

async fn run(config: &RequestConfig, stores: Stores, requesters: usize, seed: u64) -> RunReport {
    linkbench_engine::run(
        config,
        stores,
        requesters,
        seed,
        Arc::new(LatencyHistograms::new()),
    )
    .await
    .unwrap()
}

/// Inserts `per_id1` links for every id1 in `[start, end)`, with increasing timestamps.
fn preload(store: &InMemoryStore, start: i64, end: i64, per_id1: i64) {
    for id1 in start..end {
        for id2 in 0..per_id1 {
            store.insert_link(Link {
                id1,
                id2: 1_000 + id2,
                link_type: LINK_TYPE,
                time: 10_000 + id2,
                ..Default::default()
            });
        }
    }
}

#[tokio::test]
async fn single_link_reads_fixed_link() {
    linkbench_test::tracing::init();

    let config = RequestConfig {
        requests: 500,
        min_id: 10,
        max_id: 11,
        ..links_only(OperationMix {
            add_link: 100.0,
            ..Default::default()
        })
    };
    let store = InMemoryStore::new(10).with_call_log();
    let report = run(&config, Stores::links_only(Arc::new(store.clone())), 1, 3).await;

    let calls = store.calls();
    assert_eq!(calls.len(), 501);
    let StoreCall::AddLink { id1: 10, id2 } = calls[0] else {
        panic!("expected the fixed link insert, got {:?}", calls[0]);
    };
    for call in &calls[1..] {
        assert_eq!(
            *call,
            StoreCall::MultigetLinks {
                id1: 10,
                id2s: vec![id2]
            }
        );
    }

    let requester = &report.requesters[0];
    assert_eq!(requester.state, RequesterState::Completed);
    assert_eq!(requester.requests_done, 500);
    assert_eq!(requester.found, 500);
    assert_eq!(requester.not_found, 0);
}

#[tokio::test]
async fn single_link_aborts_on_first_failure() {
    linkbench_test::tracing::init();

    let config = RequestConfig {
        requests: 500,
        min_id: 10,
        max_id: 11,
        max_failed_requests: 100,
        ..links_only(OperationMix {
            add_link: 100.0,
            ..Default::default()
        })
    };
    let store = InMemoryStore::new(10).with_call_log();
    // The insert and 99 reads succeed, the 100th read fails.
    store.fail_after(100, 1);
    let report = run(&config, Stores::links_only(Arc::new(store.clone())), 1, 3).await;

    assert_eq!(store.calls().len(), 101);
    let requester = &report.requesters[0];
    assert_eq!(requester.state, RequesterState::Aborted);
    assert_eq!(requester.requests_done, 99);
    assert_eq!(requester.errors, 1);
}

#[tokio::test]
async fn historical_reads_replace_forward_reads() {
    linkbench_test::tracing::init();

    let config = RequestConfig {
        requests: 200,
        max_id: 11,
        historical_list_percent: 100.0,
        ..links_only(OperationMix {
            get_link_list: 100.0,
            ..Default::default()
        })
    };
    let store = InMemoryStore::new(5).with_call_log();
    preload(&store, 1, 11, 20);
    let report = run(&config, Stores::links_only(Arc::new(store.clone())), 1, 11).await;

    let calls = store.calls();
    assert_eq!(calls.len(), 200);
    // The first read finds an empty tail cache, its truncated result populates it.
    assert!(matches!(calls[0], StoreCall::GetLinkList { .. }));
    assert!(
        calls[1..]
            .iter()
            .all(|call| matches!(call, StoreCall::GetLinkListRange { .. }))
    );
    assert_eq!(report.requesters[0].state, RequesterState::Completed);
}

#[tokio::test]
async fn no_historical_reads_by_default() {
    let config = RequestConfig {
        requests: 200,
        max_id: 11,
        ..links_only(OperationMix {
            get_link_list: 100.0,
            ..Default::default()
        })
    };
    let store = InMemoryStore::new(5).with_call_log();
    preload(&store, 1, 11, 20);
    run(&config, Stores::links_only(Arc::new(store.clone())), 1, 11).await;

    assert!(
        store
            .calls()
            .iter()
            .all(|call| matches!(call, StoreCall::GetLinkList { .. }))
    );
}

#[tokio::test]
async fn same_seed_issues_same_operations() {
    linkbench_test::tracing::init();

    let config = RequestConfig {
        requests: 2_000,
        max_id: 1_001,
        read_access: AccessConfig::Zipf {
            shape: 1.2,
            shuffle: true,
        },
        write_access: AccessConfig::RoundRobin,
        display_freq: Duration::ZERO,
        max_time: Duration::ZERO,
        ..Default::default()
    };

    let mut runs = Vec::new();
    for seed in [17, 17, 18] {
        let store = InMemoryStore::new(100).with_call_log();
        run(&config, Stores::shared(Arc::new(store.clone())), 1, seed).await;
        runs.push(store.calls());
    }

    assert_eq!(runs[0].len(), 2_000);
    assert_eq!(runs[0], runs[1]);
    assert_ne!(runs[0], runs[2]);
}

#[tokio::test]
async fn failure_budget_aborts_requester() {
    linkbench_test::tracing::init();

    let config = RequestConfig {
        max_failed_requests: 2,
        ..links_only(OperationMix {
            count_link: 100.0,
            ..Default::default()
        })
    };
    let store = InMemoryStore::new(10).with_call_log();
    store.fail_next(5);
    let report = run(&config, Stores::links_only(Arc::new(store.clone())), 1, 0).await;

    assert_eq!(store.calls().len(), 3);
    let requester = &report.requesters[0];
    assert_eq!(requester.state, RequesterState::Aborted);
    assert_eq!(requester.errors, 3);
}

#[tokio::test]
async fn negative_budget_never_aborts() {
    let config = RequestConfig {
        requests: 100,
        max_failed_requests: -1,
        ..links_only(OperationMix {
            count_link: 100.0,
            ..Default::default()
        })
    };
    let store = InMemoryStore::new(10);
    store.fail_next(60);
    let report = run(&config, Stores::links_only(Arc::new(store)), 1, 0).await;

    let requester = &report.requesters[0];
    assert_eq!(requester.state, RequesterState::Completed);
    assert_eq!(requester.requests_done, 100);
    assert_eq!(requester.errors, 60);
}

#[tokio::test(start_paused = true)]
async fn time_limit_stops_paced_requester() {
    let config = RequestConfig {
        requests: 1_000,
        request_rate: 10.0,
        max_time: Duration::from_secs(5),
        ..links_only(OperationMix {
            add_link: 50.0,
            multiget_link: 50.0,
            ..Default::default()
        })
    };
    let store = InMemoryStore::new(10);
    let report = run(&config, Stores::links_only(Arc::new(store)), 1, 5).await;

    let requester = &report.requesters[0];
    assert_eq!(requester.state, RequesterState::TimeExpired);
    assert!(
        (25..80).contains(&requester.requests_done),
        "{} requests done",
        requester.requests_done
    );
}

#[tokio::test]
async fn requesters_record_latencies() {
    let config = RequestConfig {
        requests: 300,
        ..Default::default()
    };
    let latency = Arc::new(LatencyHistograms::new());
    let store = Arc::new(InMemoryStore::new(50));
    let report = linkbench_engine::run(&config, Stores::shared(store), 4, 1, latency.clone())
        .await
        .unwrap();

    assert_eq!(report.requesters.len(), 4);
    assert_eq!(report.requests_done(), 1_200);
    assert_eq!(report.count_in(RequesterState::Completed), 4);

    let summary = latency.summary();
    let recorded: u64 = summary.values().map(|s| s.count).sum();
    assert_eq!(recorded, 1_200);
    assert!(summary.contains_key(&OperationKind::GetLinksList));
    assert!(!summary.contains_key(&OperationKind::RangeSize));
}

#[tokio::test]
async fn invalid_mix_fails_before_any_request() {
    let config = links_only(OperationMix {
        add_link: 30.0,
        ..Default::default()
    });
    let store = InMemoryStore::new(10).with_call_log();
    let result = linkbench_engine::run(
        &config,
        Stores::links_only(Arc::new(store.clone())),
        2,
        0,
        Arc::new(LatencyHistograms::new()),
    )
    .await;

    assert!(matches!(
        result,
        Err(RequesterError::Config(ConfigError::OperationMix(_)))
    ));
    assert!(store.calls().is_empty());
}
