//! In-memory store for smoke runs and tests.
//!
//! This provides both a [`LinkStore`] and a [`NodeStore`] backed by `HashMap`s. The store is
//! [`Clone`] so tests can hold a handle for direct inspection while requesters own another. Tests
//! can additionally inject failures and record the sequence of calls the store receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use linkbench_types::{Link, Node, Phase, Visibility};

use super::common::{LinkRange, LinkStore, NodeStore};
use crate::error::{StoreError, StoreResult};

/// A store call as observed by [`InMemoryStore`], without timestamps or payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    /// [`LinkStore::add_link`], also used for link updates.
    AddLink {
        /// Source of the link.
        id1: i64,
        /// Target of the link.
        id2: i64,
    },
    /// [`LinkStore::delete_link`].
    DeleteLink {
        /// Source of the link.
        id1: i64,
        /// Target of the link.
        id2: i64,
    },
    /// [`LinkStore::multiget_links`].
    MultigetLinks {
        /// Source of the links.
        id1: i64,
        /// Requested targets.
        id2s: Vec<i64>,
    },
    /// [`LinkStore::get_link_list`].
    GetLinkList {
        /// Source of the list.
        id1: i64,
    },
    /// [`LinkStore::get_link_list_range`].
    GetLinkListRange {
        /// Source of the list.
        id1: i64,
    },
    /// [`LinkStore::count_links`].
    CountLinks {
        /// Source of the list.
        id1: i64,
    },
    /// [`NodeStore::add_node`].
    AddNode,
    /// [`NodeStore::update_node`].
    UpdateNode {
        /// The node id.
        id: i64,
    },
    /// [`NodeStore::delete_node`].
    DeleteNode {
        /// The node id.
        id: i64,
    },
    /// [`NodeStore::get_node`].
    GetNode {
        /// The node id.
        id: i64,
    },
}

/// Pending injected failures.
#[derive(Debug, Default)]
struct Faults {
    /// Calls to let through before failing.
    skip: u64,
    /// Calls to fail after that.
    fail: u64,
}

#[derive(Debug, Default)]
struct State {
    /// Links keyed by `(id1, link_type)`, then by `id2`.
    links: HashMap<(i64, i64), HashMap<i64, Link>>,
    nodes: HashMap<i64, Node>,
    next_node_id: i64,
}

/// A [`LinkStore`] and [`NodeStore`] keeping all data in memory.
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    range_limit: usize,
    state: Arc<Mutex<State>>,
    faults: Arc<Mutex<Faults>>,
    calls: Option<Arc<Mutex<Vec<StoreCall>>>>,
}

impl InMemoryStore {
    /// Creates an empty store returning at most `range_limit` links per link-list read.
    pub fn new(range_limit: usize) -> Self {
        Self {
            range_limit,
            state: Arc::new(Mutex::new(State {
                next_node_id: 1,
                ..Default::default()
            })),
            faults: Arc::new(Mutex::new(Faults::default())),
            calls: None,
        }
    }

    /// Records every call this store (and its clones) receives, see [`calls`](Self::calls).
    pub fn with_call_log(mut self) -> Self {
        self.calls = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    /// Makes the next `count` operations fail with [`StoreError::Operation`].
    ///
    /// Initialization is not affected.
    pub fn fail_next(&self, count: u64) {
        self.fail_after(0, count);
    }

    /// Lets the next `calls` operations succeed, then makes `count` operations fail.
    pub fn fail_after(&self, calls: u64, count: u64) {
        *self.faults.lock().unwrap() = Faults {
            skip: calls,
            fail: count,
        };
    }

    /// Returns the calls recorded so far, or an empty list if the call log is disabled.
    pub fn calls(&self) -> Vec<StoreCall> {
        match &self.calls {
            Some(calls) => calls.lock().unwrap().clone(),
            None => Vec::new(),
        }
    }

    /// Inserts a link directly, bypassing the call log and fault injection.
    ///
    /// Useful to populate the store before a request phase.
    pub fn insert_link(&self, link: Link) {
        let mut state = self.state.lock().unwrap();
        state
            .links
            .entry((link.id1, link.link_type))
            .or_default()
            .insert(link.id2, link);
    }

    /// Returns the number of stored links, including hidden ones.
    pub fn link_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.links.values().map(HashMap::len).sum()
    }

    /// Returns the number of stored nodes.
    pub fn node_count(&self) -> usize {
        self.state.lock().unwrap().nodes.len()
    }

    /// Logs the call and consumes a pending failure, if any.
    fn begin(&self, call: StoreCall) -> StoreResult<()> {
        if let Some(calls) = &self.calls {
            calls.lock().unwrap().push(call);
        }

        let mut faults = self.faults.lock().unwrap();
        if faults.fail == 0 {
            return Ok(());
        }
        if faults.skip > 0 {
            faults.skip -= 1;
            return Ok(());
        }

        faults.fail -= 1;
        Err(StoreError::Operation("injected failure".to_owned()))
    }

    /// Returns the visible links of a list within the time bounds, newest first.
    fn list(&self, id1: i64, link_type: i64, min_time: i64, max_time: i64) -> Vec<Link> {
        let state = self.state.lock().unwrap();
        let Some(list) = state.links.get(&(id1, link_type)) else {
            return Vec::new();
        };

        let mut links: Vec<_> = list
            .values()
            .filter(|l| l.visibility == Visibility::Visible)
            .filter(|l| (min_time..=max_time).contains(&l.time))
            .cloned()
            .collect();
        links.sort_unstable_by(|a, b| b.time.cmp(&a.time).then(b.id2.cmp(&a.id2)));
        links
    }
}

#[async_trait::async_trait]
impl LinkStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn initialize(&self, _phase: Phase, _requester: usize) -> StoreResult<()> {
        Ok(())
    }

    async fn add_link(&self, _dbid: &str, link: &Link, _no_inverse: bool) -> StoreResult<()> {
        self.begin(StoreCall::AddLink {
            id1: link.id1,
            id2: link.id2,
        })?;
        self.insert_link(link.clone());
        Ok(())
    }

    async fn delete_link(
        &self,
        _dbid: &str,
        id1: i64,
        link_type: i64,
        id2: i64,
        _no_inverse: bool,
        expunge: bool,
    ) -> StoreResult<()> {
        self.begin(StoreCall::DeleteLink { id1, id2 })?;

        let mut state = self.state.lock().unwrap();
        if let Some(list) = state.links.get_mut(&(id1, link_type)) {
            if expunge {
                list.remove(&id2);
            } else if let Some(link) = list.get_mut(&id2) {
                link.visibility = Visibility::Hidden;
            }
        }
        Ok(())
    }

    async fn multiget_links(
        &self,
        _dbid: &str,
        id1: i64,
        link_type: i64,
        id2s: &[i64],
    ) -> StoreResult<Vec<Link>> {
        self.begin(StoreCall::MultigetLinks {
            id1,
            id2s: id2s.to_vec(),
        })?;

        let state = self.state.lock().unwrap();
        let Some(list) = state.links.get(&(id1, link_type)) else {
            return Ok(Vec::new());
        };
        Ok(id2s
            .iter()
            .filter_map(|id2| list.get(id2))
            .filter(|l| l.visibility == Visibility::Visible)
            .cloned()
            .collect())
    }

    async fn get_link_list(&self, _dbid: &str, id1: i64, link_type: i64) -> StoreResult<Vec<Link>> {
        self.begin(StoreCall::GetLinkList { id1 })?;

        let mut links = self.list(id1, link_type, i64::MIN, i64::MAX);
        links.truncate(self.range_limit);
        Ok(links)
    }

    async fn get_link_list_range(
        &self,
        _dbid: &str,
        id1: i64,
        link_type: i64,
        range: LinkRange,
    ) -> StoreResult<Vec<Link>> {
        self.begin(StoreCall::GetLinkListRange { id1 })?;

        let limit = range.limit.min(self.range_limit);
        Ok(self
            .list(id1, link_type, range.min_time, range.max_time)
            .into_iter()
            .skip(range.offset)
            .take(limit)
            .collect())
    }

    async fn count_links(&self, _dbid: &str, id1: i64, link_type: i64) -> StoreResult<u64> {
        self.begin(StoreCall::CountLinks { id1 })?;

        let state = self.state.lock().unwrap();
        let count = state.links.get(&(id1, link_type)).map_or(0, |list| {
            list.values()
                .filter(|l| l.visibility == Visibility::Visible)
                .count()
        });
        Ok(count as u64)
    }

    fn range_limit(&self) -> usize {
        self.range_limit
    }

    fn clear_errors(&self, _requester: usize) {}
}

#[async_trait::async_trait]
impl NodeStore for InMemoryStore {
    async fn initialize(&self, _phase: Phase, _requester: usize) -> StoreResult<()> {
        Ok(())
    }

    async fn add_node(&self, _dbid: &str, node: &Node) -> StoreResult<i64> {
        self.begin(StoreCall::AddNode)?;

        let mut state = self.state.lock().unwrap();
        let id = state.next_node_id;
        state.next_node_id += 1;
        state.nodes.insert(id, Node { id, ..node.clone() });
        Ok(id)
    }

    async fn update_node(&self, _dbid: &str, node: &Node) -> StoreResult<bool> {
        self.begin(StoreCall::UpdateNode { id: node.id })?;

        let mut state = self.state.lock().unwrap();
        match state.nodes.get_mut(&node.id) {
            Some(existing) => {
                *existing = node.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_node(&self, _dbid: &str, node_type: i32, id: i64) -> StoreResult<bool> {
        self.begin(StoreCall::DeleteNode { id })?;

        let mut state = self.state.lock().unwrap();
        match state.nodes.get(&id) {
            Some(node) if node.node_type == node_type => Ok(state.nodes.remove(&id).is_some()),
            _ => Ok(false),
        }
    }

    async fn get_node(&self, _dbid: &str, node_type: i32, id: i64) -> StoreResult<Option<Node>> {
        self.begin(StoreCall::GetNode { id })?;

        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .get(&id)
            .filter(|node| node.node_type == node_type)
            .cloned())
    }

    fn clear_errors(&self, _requester: usize) {}
}
