use std::fmt::Debug;
use std::sync::Arc;

use linkbench_types::{Link, Node, Phase};

use crate::error::StoreResult;

/// Bounds of a link-list read beyond the default "newest first" listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkRange {
    /// Oldest timestamp to include.
    pub min_time: i64,
    /// Newest timestamp to include.
    pub max_time: i64,
    /// Number of matching links to skip, newest first.
    pub offset: usize,
    /// Maximum number of links to return.
    pub limit: usize,
}

/// A store of links, driven concurrently by all requesters.
///
/// Implementations must be safe to call from many requesters at once. Failures of individual
/// operations are reported as [`StoreError`](crate::error::StoreError) and never retried.
#[async_trait::async_trait]
pub trait LinkStore: Debug + Send + Sync + 'static {
    /// The store name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Prepares the store for use by the given requester.
    async fn initialize(&self, phase: Phase, requester: usize) -> StoreResult<()>;

    /// Inserts or overwrites a link.
    async fn add_link(&self, dbid: &str, link: &Link, no_inverse: bool) -> StoreResult<()>;

    /// Deletes the link `(id1, link_type, id2)`.
    ///
    /// With `expunge` the link is removed, otherwise it is only hidden.
    async fn delete_link(
        &self,
        dbid: &str,
        id1: i64,
        link_type: i64,
        id2: i64,
        no_inverse: bool,
        expunge: bool,
    ) -> StoreResult<()>;

    /// Fetches the visible links from `id1` to any of `id2s`.
    async fn multiget_links(
        &self,
        dbid: &str,
        id1: i64,
        link_type: i64,
        id2s: &[i64],
    ) -> StoreResult<Vec<Link>>;

    /// Lists the newest visible links of `(id1, link_type)`, at most [`range_limit`] of them.
    ///
    /// [`range_limit`]: LinkStore::range_limit
    async fn get_link_list(&self, dbid: &str, id1: i64, link_type: i64) -> StoreResult<Vec<Link>>;

    /// Lists the visible links of `(id1, link_type)` within `range`, newest first.
    async fn get_link_list_range(
        &self,
        dbid: &str,
        id1: i64,
        link_type: i64,
        range: LinkRange,
    ) -> StoreResult<Vec<Link>>;

    /// Counts the visible links of `(id1, link_type)`.
    async fn count_links(&self, dbid: &str, id1: i64, link_type: i64) -> StoreResult<u64>;

    /// The maximum number of links returned by a single link-list read.
    fn range_limit(&self) -> usize;

    /// Resets any error state the store keeps for the given requester.
    fn clear_errors(&self, requester: usize);
}

/// A store of nodes, driven concurrently by all requesters.
#[async_trait::async_trait]
pub trait NodeStore: Debug + Send + Sync + 'static {
    /// Prepares the store for use by the given requester.
    async fn initialize(&self, phase: Phase, requester: usize) -> StoreResult<()>;

    /// Inserts a node and returns the id the store assigned to it.
    async fn add_node(&self, dbid: &str, node: &Node) -> StoreResult<i64>;

    /// Overwrites an existing node. Returns `false` if no node with that id exists.
    async fn update_node(&self, dbid: &str, node: &Node) -> StoreResult<bool>;

    /// Deletes a node. Returns `false` if no node with that id exists.
    async fn delete_node(&self, dbid: &str, node_type: i32, id: i64) -> StoreResult<bool>;

    /// Fetches a node.
    async fn get_node(&self, dbid: &str, node_type: i32, id: i64) -> StoreResult<Option<Node>>;

    /// Resets any error state the store keeps for the given requester.
    fn clear_errors(&self, requester: usize);
}

/// The stores a requester issues operations against.
#[derive(Clone, Debug)]
pub struct Stores {
    pub(crate) links: Arc<dyn LinkStore>,
    pub(crate) nodes: Option<Arc<dyn NodeStore>>,
    /// Whether `nodes` is the same instance as `links`, so it is only initialized once.
    pub(crate) shared: bool,
}

impl Stores {
    /// Uses a link store without node support.
    pub fn links_only(links: Arc<dyn LinkStore>) -> Self {
        Self {
            links,
            nodes: None,
            shared: false,
        }
    }

    /// Uses separate link and node stores.
    pub fn separate(links: Arc<dyn LinkStore>, nodes: Arc<dyn NodeStore>) -> Self {
        Self {
            links,
            nodes: Some(nodes),
            shared: false,
        }
    }

    /// Uses a single store for both links and nodes.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: LinkStore + NodeStore,
    {
        let nodes: Arc<dyn NodeStore> = store.clone();
        Self {
            links: store,
            nodes: Some(nodes),
            shared: true,
        }
    }

    /// Returns `true` if a node store is available.
    pub fn has_nodes(&self) -> bool {
        self.nodes.is_some()
    }

    /// Initializes all stores for the given requester.
    pub(crate) async fn initialize(&self, phase: Phase, requester: usize) -> StoreResult<()> {
        self.links.initialize(phase, requester).await?;
        if let Some(nodes) = &self.nodes
            && !self.shared
        {
            nodes.initialize(phase, requester).await?;
        }
        Ok(())
    }
}
