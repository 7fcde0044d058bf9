//! The request loop of a single requester.
//!
//! A [`Requester`] owns everything it needs to issue requests: a seeded random number generator,
//! the operation and id selectors, a tail history cache and a failure budget. The only state it
//! shares with other requesters is the [`RequestProgress`] counter and the latency sink.
//!
//! Every iteration of the loop paces the request, draws an operation kind, resolves its operands,
//! and only then calls the store. Operands never depend on store timing, so two requesters with
//! the same seed and index issue the same sequence of operations.

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use linkbench_types::{
    ID1_TYPE, ID2_TYPE, LINK_TYPE, Link, Node, OperationKind, Phase, TailCursor, Visibility,
};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tokio::time::Instant;

use crate::config::RequestConfig;
use crate::distribution::probability_distribution;
use crate::error::{ConfigError, RequesterError, StoreError, StoreResult};
use crate::failure_budget::FailureBudget;
use crate::id_selector::{
    AccessKind, EXISTING_ON_ADD, EXISTING_ON_DELETE, EXISTING_ON_UPDATE, Id2Chooser, IdSelector,
};
use crate::progress::{REPORT_INTERVAL, RequestProgress};
use crate::rate_limiter::RateLimiter;
use crate::selector::OperationSelector;
use crate::stats::{LatencyStats, SketchStats, StatsRecorder};
use crate::store::{LinkRange, NodeStore, Stores};
use crate::tail_cache::{DEFAULT_CAPACITY, TailHistoryCache};

/// Payload size of written nodes.
const NODE_DATA_SIZE: usize = 512;

/// Number of distinct payload bytes of written links.
const LINK_DATA_RANGE: u8 = 4;

/// Lifecycle of a [`Requester`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequesterState {
    /// The stores are being initialized.
    Initializing,
    /// Requests are being issued.
    Running,
    /// All configured requests were issued.
    Completed,
    /// The requester gave up after failed requests.
    Aborted,
    /// The time limit passed before all requests were issued.
    TimeExpired,
}

impl RequesterState {
    /// Returns `true` if the requester has stopped.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequesterState::Completed | RequesterState::Aborted | RequesterState::TimeExpired
        )
    }
}

/// The result of running a [`Requester`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequesterReport {
    /// Index of the requester.
    pub requester: usize,
    /// The terminal state.
    pub state: RequesterState,
    /// Requests issued, including failed ones. In single-link mode, only links found.
    pub requests_done: u64,
    /// Failed requests.
    pub errors: u64,
    /// Links returned by multigets.
    pub found: u64,
    /// Links requested by multigets but not returned.
    pub not_found: u64,
}

/// A request with resolved operands.
#[derive(Clone, Debug, PartialEq)]
enum Request {
    AddLink(Link),
    UpdateLink(Link),
    DeleteLink { id1: i64, id2: i64 },
    CountLinks { id1: i64 },
    MultigetLinks { id1: i64, id2s: Vec<i64> },
    GetLinkList { id1: i64 },
    /// Continues a truncated link list from the cursor stored in `slot` of the tail cache.
    HistoricalLinkList { slot: usize, cursor: TailCursor },
    AddNode(Node),
    UpdateNode(Node),
    DeleteNode { id: i64 },
    GetNode { id: i64 },
}

#[derive(Debug)]
enum Response {
    Done,
    Links(Vec<Link>),
    Count(u64),
    NodeId(i64),
    Changed(bool),
    Node(Option<Node>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    /// The draw did not select any operation.
    Skipped,
}

/// Issues the requests of one requester against the stores.
#[derive(Debug)]
pub struct Requester {
    requester: usize,
    requests: u64,
    request_rate: f64,
    max_time: Duration,
    progress_freq: Duration,
    dbid: String,
    link_data_size: usize,
    p_historical: f64,
    start_id: i64,
    single_link: bool,

    stores: Stores,
    selector: OperationSelector,
    ids: IdSelector,
    tail_cache: TailHistoryCache,
    budget: FailureBudget,
    stats: StatsRecorder,
    progress: Arc<RequestProgress>,
    rng: SmallRng,

    state: RequesterState,
    requests_done: u64,
    unreported: u64,
    found: u64,
    not_found: u64,
    last_link_id1: i64,
    last_node_id: i64,
}

impl Requester {
    /// Creates requester `requester` out of `requesters`.
    ///
    /// The random number generator is seeded from `seed` and the requester index. Fails if the
    /// operation mix is malformed, if node operations are configured without a node store or
    /// node access distribution, or if a distribution cannot be built.
    pub fn new(
        config: &RequestConfig,
        stores: Stores,
        latency: Arc<dyn LatencyStats>,
        progress: Arc<RequestProgress>,
        requester: usize,
        requesters: usize,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        if requester >= requesters {
            return Err(ConfigError::BadRequesterId {
                id: requester,
                requesters,
            });
        }

        let selector = OperationSelector::from_mix(&config.operations, stores.has_nodes())?;
        if selector.has_node_operations() && config.node_access.is_none() {
            return Err(ConfigError::MissingNodeDistribution);
        }

        let start_id = config.start_id();
        let max_id = config.max_id;
        let node_access = match &config.node_access {
            Some(access) => Some(access.build(start_id, max_id)?),
            None => None,
        };
        let endpoints = Id2Chooser::new(start_id, max_id, config.id2_fanout, requesters, requester);
        let mut ids = IdSelector::new(
            start_id,
            max_id,
            config.read_access.build(start_id, max_id)?,
            config.write_access.build(start_id, max_id)?,
            node_access,
            Box::new(endpoints),
        );
        if let Some(multiget) = &config.multiget {
            let counts =
                probability_distribution(&multiget.name, multiget.min, multiget.max, &multiget.params)?;
            ids = ids.with_multiget_counts(counts);
        }

        let sampled = SketchStats::new(requester, config.display_freq, config.max_stat_samples);

        Ok(Self {
            requester,
            requests: config.requests,
            request_rate: config.request_rate,
            max_time: config.max_time,
            progress_freq: config.progress_freq,
            dbid: config.dbid.clone(),
            link_data_size: config.link_data_size.as_u64() as usize,
            p_historical: config.historical_list_percent / 100.0,
            start_id,
            single_link: config.is_single_link(),

            stores,
            selector,
            ids,
            tail_cache: TailHistoryCache::new(DEFAULT_CAPACITY),
            budget: FailureBudget::new(config.max_failed_requests),
            stats: StatsRecorder::new(requester, Box::new(sampled), latency),
            progress,
            rng: SmallRng::seed_from_u64(seed.wrapping_add(requester as u64)),

            state: RequesterState::Initializing,
            requests_done: 0,
            unreported: 0,
            found: 0,
            not_found: 0,
            last_link_id1: start_id,
            last_node_id: start_id,
        })
    }

    /// Returns the current state.
    pub fn state(&self) -> RequesterState {
        self.state
    }

    /// Returns `true` if this requester reads a single fixed link instead of the operation mix.
    pub fn is_single_link(&self) -> bool {
        self.single_link
    }

    /// Initializes the stores and issues all requests.
    ///
    /// Failed requests do not return an error, they are counted and may abort the requester,
    /// which is reflected in the report's state. Only store initialization errors are returned.
    pub async fn run(mut self) -> Result<RequesterReport, RequesterError> {
        tracing::info!(
            requester = self.requester,
            requests = self.requests,
            single_link = self.single_link,
            "requester started"
        );
        self.stores.initialize(Phase::Request, self.requester).await?;

        self.state = RequesterState::Running;
        let started = Instant::now();
        let deadline = (!self.max_time.is_zero()).then(|| started + self.max_time);

        if self.single_link {
            self.state = self.run_single_link(deadline).await;
            if self.state == RequesterState::Aborted {
                return Ok(self.report());
            }
        } else {
            self.state = self.run_mixed(deadline).await;
        }

        self.finish(started);
        Ok(self.report())
    }

    async fn run_mixed(&mut self, deadline: Option<Instant>) -> RequesterState {
        let mut limiter = RateLimiter::new(self.request_rate);
        let mut last_log = Instant::now();

        while self.requests_done < self.requests {
            limiter.pace(&mut self.rng).await;

            let outcome = self.one_request().await;
            self.requests_done += 1;
            match outcome {
                Outcome::Succeeded => self.budget.on_success(),
                Outcome::Failed => {
                    if self.budget.on_failure() {
                        self.unreported += 1;
                        tracing::error!(
                            requester = self.requester,
                            errors = self.budget.errors(),
                            requests_done = self.requests_done,
                            "requester aborting after failed requests"
                        );
                        return RequesterState::Aborted;
                    }
                }
                Outcome::Skipped => (),
            }

            let now = Instant::now();
            if now.duration_since(last_log) > self.progress_freq {
                self.log_progress();
                last_log = now;
            }

            self.unreported += 1;
            if deadline.is_some_and(|deadline| now > deadline) {
                return RequesterState::TimeExpired;
            }
            if self.unreported >= REPORT_INTERVAL {
                self.progress.update(self.unreported);
                self.unreported = 0;
            }
        }

        RequesterState::Completed
    }

    /// Inserts one link and reads it back with a multiget `requests` times.
    ///
    /// Any failure aborts immediately, regardless of the failure budget.
    async fn run_single_link(&mut self, deadline: Option<Instant>) -> RequesterState {
        let id1 = self.start_id;
        let id2 = self.ids.choose_id2(&mut self.rng, id1, EXISTING_ON_ADD);
        let link = self.new_link(id1, id2, b'a');

        let started = Instant::now();
        let result = self.stores.links.add_link(&self.dbid, &link, true).await;
        if let Err(error) = result {
            self.on_error(OperationKind::AddLink, started, &error);
            self.budget.on_failure();
            return RequesterState::Aborted;
        }
        self.stats
            .record(OperationKind::AddLink, micros_since(started), false);

        for _ in 0..self.requests {
            let started = Instant::now();
            let result = self
                .stores
                .links
                .multiget_links(&self.dbid, id1, LINK_TYPE, &[id2])
                .await;

            match result {
                Ok(links) => {
                    self.stats
                        .record(OperationKind::MultigetLink, micros_since(started), false);
                    if links.len() == 1 {
                        self.requests_done += 1;
                        self.found += 1;
                    } else {
                        tracing::warn!(requester = self.requester, id1, id2, "fixed link not found");
                        self.not_found += 1;
                    }
                }
                Err(error) => {
                    self.on_error(OperationKind::MultigetLink, started, &error);
                    self.budget.on_failure();
                    return RequesterState::Aborted;
                }
            }

            self.unreported += 1;
            if deadline.is_some_and(|deadline| Instant::now() > deadline) {
                return RequesterState::TimeExpired;
            }
            if self.unreported >= REPORT_INTERVAL {
                self.progress.update(self.unreported);
                self.unreported = 0;
            }
        }

        RequesterState::Completed
    }

    async fn one_request(&mut self) -> Outcome {
        let r = self.rng.random_range(0.0..100.0);
        let kind = self.selector.select(r);
        let Some(request) = self.plan(kind) else {
            tracing::error!(
                requester = self.requester,
                r,
                "no operation selected, operation mix does not add up to 100"
            );
            return Outcome::Skipped;
        };
        tracing::trace!(requester = self.requester, ?request, "issuing request");

        let started = Instant::now();
        let result = self.execute(&request).await;
        match result {
            Ok(response) => {
                let micros = micros_since(started);
                self.complete(request, response);
                self.stats.record(kind, micros, false);
                Outcome::Succeeded
            }
            Err(error) => {
                self.on_error(kind, started, &error);
                Outcome::Failed
            }
        }
    }

    /// Resolves the operands of an operation of the given kind.
    ///
    /// Returns `None` for kinds that cannot be issued.
    fn plan(&mut self, kind: OperationKind) -> Option<Request> {
        let request = match kind {
            OperationKind::AddLink => {
                let id1 = self.link_id1(AccessKind::Write);
                let id2 = self.ids.choose_id2(&mut self.rng, id1, EXISTING_ON_ADD);
                Request::AddLink(self.new_link(id1, id2, b'a'))
            }
            OperationKind::DeleteLink => {
                let id1 = self.link_id1(AccessKind::Write);
                let id2 = self.ids.choose_id2(&mut self.rng, id1, EXISTING_ON_DELETE);
                Request::DeleteLink { id1, id2 }
            }
            OperationKind::UpdateLink => {
                let id1 = self.link_id1(AccessKind::Write);
                let id2 = self.ids.choose_id2(&mut self.rng, id1, EXISTING_ON_UPDATE);
                Request::UpdateLink(self.new_link(id1, id2, b'e'))
            }
            OperationKind::CountLink => Request::CountLinks {
                id1: self.link_id1(AccessKind::Read),
            },
            OperationKind::MultigetLink => {
                let id1 = self.link_id1(AccessKind::Read);
                let id2s = self.ids.choose_multiget_id2s(&mut self.rng, id1);
                Request::MultigetLinks { id1, id2s }
            }
            OperationKind::GetLinksList => match self.historical_cursor() {
                Some((slot, cursor)) => Request::HistoricalLinkList { slot, cursor },
                None => Request::GetLinkList {
                    id1: self.link_id1(AccessKind::Read),
                },
            },
            OperationKind::AddNode => Request::AddNode(self.new_node(Node::UNASSIGNED)),
            OperationKind::UpdateNode => {
                let id = self.node_id();
                Request::UpdateNode(self.new_node(id))
            }
            OperationKind::DeleteNode => Request::DeleteNode { id: self.node_id() },
            OperationKind::GetNode => Request::GetNode { id: self.node_id() },
            OperationKind::RangeSize | OperationKind::Unknown => return None,
        };
        Some(request)
    }

    /// Decides whether a link-list read continues a truncated list instead.
    fn historical_cursor(&mut self) -> Option<(usize, TailCursor)> {
        if self.p_historical <= 0.0 || self.tail_cache.is_empty() {
            return None;
        }
        if self.rng.random::<f64>() >= self.p_historical {
            return None;
        }
        self.tail_cache.sample(&mut self.rng)
    }

    async fn execute(&self, request: &Request) -> StoreResult<Response> {
        let links = &self.stores.links;
        let dbid = self.dbid.as_str();

        match request {
            Request::AddLink(link) | Request::UpdateLink(link) => {
                links.add_link(dbid, link, true).await?;
                Ok(Response::Done)
            }
            Request::DeleteLink { id1, id2 } => {
                links
                    .delete_link(dbid, *id1, LINK_TYPE, *id2, true, false)
                    .await?;
                Ok(Response::Done)
            }
            Request::CountLinks { id1 } => {
                let count = links.count_links(dbid, *id1, LINK_TYPE).await?;
                Ok(Response::Count(count))
            }
            Request::MultigetLinks { id1, id2s } => {
                let found = links.multiget_links(dbid, *id1, LINK_TYPE, id2s).await?;
                Ok(Response::Links(found))
            }
            Request::GetLinkList { id1 } => {
                let list = links.get_link_list(dbid, *id1, LINK_TYPE).await?;
                Ok(Response::Links(list))
            }
            Request::HistoricalLinkList { cursor, .. } => {
                let range = LinkRange {
                    min_time: 0,
                    max_time: cursor.time,
                    offset: 1,
                    limit: links.range_limit(),
                };
                let list = links
                    .get_link_list_range(dbid, cursor.id1, cursor.link_type, range)
                    .await?;
                Ok(Response::Links(list))
            }
            Request::AddNode(node) => {
                let id = self.node_store()?.add_node(dbid, node).await?;
                Ok(Response::NodeId(id))
            }
            Request::UpdateNode(node) => {
                let changed = self.node_store()?.update_node(dbid, node).await?;
                Ok(Response::Changed(changed))
            }
            Request::DeleteNode { id } => {
                let deleted = self.node_store()?.delete_node(dbid, ID1_TYPE, *id).await?;
                Ok(Response::Changed(deleted))
            }
            Request::GetNode { id } => {
                let node = self.node_store()?.get_node(dbid, ID1_TYPE, *id).await?;
                Ok(Response::Node(node))
            }
        }
    }

    /// Updates the requester state with the response of a successful request.
    fn complete(&mut self, request: Request, response: Response) {
        let range_limit = self.stores.links.range_limit();

        match (request, response) {
            (Request::MultigetLinks { id2s, .. }, Response::Links(links)) => {
                // Partial hits only count as found.
                if links.is_empty() {
                    self.not_found += id2s.len() as u64;
                } else {
                    self.found += links.len() as u64;
                }
            }
            (Request::GetLinkList { .. }, Response::Links(links)) => {
                self.stats.record_range_size(links.len());
                if let Some(oldest) = links.last().filter(|_| links.len() >= range_limit) {
                    self.tail_cache.record(&mut self.rng, oldest.tail_cursor());
                }
            }
            (Request::HistoricalLinkList { slot, .. }, Response::Links(links)) => {
                self.stats.record_range_size(links.len());
                if let Some(oldest) = links.last().filter(|_| links.len() >= range_limit) {
                    self.tail_cache.replace(slot, oldest.tail_cursor());
                }
            }
            (Request::AddNode(_), Response::NodeId(id)) => {
                self.last_node_id = id;
            }
            (Request::GetNode { id }, Response::Node(node)) => {
                tracing::trace!(requester = self.requester, id, found = node.is_some(), "get node");
            }
            (request, Response::Changed(changed)) => {
                tracing::trace!(requester = self.requester, ?request, changed, "node written");
            }
            (_, Response::Done | Response::Count(_)) => (),
            (request, response) => {
                tracing::warn!(?request, ?response, "unexpected store response");
            }
        }
    }

    fn on_error(&mut self, kind: OperationKind, started: Instant, error: &StoreError) {
        tracing::error!(
            requester = self.requester,
            kind = %kind,
            error = error as &dyn Error,
            "request failed"
        );
        self.stats.record(kind, micros_since(started), true);

        self.stores.links.clear_errors(self.requester);
        if kind.is_node_operation() && !self.stores.shared {
            if let Some(nodes) = &self.stores.nodes {
                nodes.clear_errors(self.requester);
            }
        }
    }

    fn node_store(&self) -> StoreResult<&dyn NodeStore> {
        self.stores
            .nodes
            .as_deref()
            .ok_or_else(|| StoreError::Operation("no node store configured".to_owned()))
    }

    fn link_id1(&mut self, kind: AccessKind) -> i64 {
        let id = self.ids.choose_id(kind, &mut self.rng, self.last_link_id1);
        self.last_link_id1 = id;
        id
    }

    fn node_id(&mut self) -> i64 {
        let id = self
            .ids
            .choose_id(AccessKind::Node, &mut self.rng, self.last_node_id);
        self.last_node_id = id;
        id
    }

    fn new_link(&mut self, id1: i64, id2: i64, first_byte: u8) -> Link {
        let data: Vec<u8> = (0..self.link_data_size)
            .map(|_| first_byte + self.rng.random_range(0..LINK_DATA_RANGE))
            .collect();

        Link {
            id1,
            id2,
            link_type: LINK_TYPE,
            id1_type: ID1_TYPE,
            id2_type: ID2_TYPE,
            visibility: Visibility::Visible,
            data: Bytes::from(data),
            version: 0,
            time: now_millis(),
        }
    }

    fn new_node(&mut self, id: i64) -> Node {
        let mut data = vec![0; NODE_DATA_SIZE];
        self.rng.fill_bytes(&mut data);
        Node {
            id,
            ..Node::unassigned(ID1_TYPE, Bytes::from(data))
        }
    }

    fn log_progress(&self) {
        tracing::info!(
            requester = self.requester,
            "requester {}: {}/{} requests done",
            self.requester,
            self.requests_done,
            self.requests
        );
    }

    /// Flushes progress and logs the final summary.
    fn finish(&mut self, started: Instant) {
        self.progress.update(std::mem::take(&mut self.unreported));
        self.stats.display();

        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            self.requests_done as f64 / elapsed
        } else {
            0.0
        };
        tracing::info!(
            requester = self.requester,
            state = ?self.state,
            requests = self.requests_done,
            requests_per_sec = rate,
            found = self.found,
            not_found = self.not_found,
            "requester finished"
        );
    }

    fn report(&self) -> RequesterReport {
        RequesterReport {
            requester: self.requester,
            state: self.state,
            requests_done: self.requests_done,
            errors: self.budget.errors(),
            found: self.found,
            not_found: self.not_found,
        }
    }
}

fn micros_since(started: Instant) -> u64 {
    started.elapsed().as_micros() as u64
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
