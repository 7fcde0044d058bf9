//! Chooses the ids operations are issued against.

use std::fmt::Debug;

use rand::{Rng, RngCore};

use crate::distribution::{AccessDistribution, ProbabilityDistribution};

/// Probability that a link insert targets an already existing link.
pub const EXISTING_ON_ADD: f64 = 0.5;
/// Probability that a link update targets an already existing link.
pub const EXISTING_ON_UPDATE: f64 = 0.5;
/// Probability that a link delete targets an already existing link.
pub const EXISTING_ON_DELETE: f64 = 1.0;
/// Probability that a link read in a multiget targets an already existing link.
pub const EXISTING_ON_MULTIGET: f64 = 0.5;

/// The access pattern an id is chosen for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Link reads.
    Read,
    /// Link writes.
    Write,
    /// Node reads and writes.
    Node,
}

/// Chooses the target of a link operation.
pub trait EndpointChooser: Debug + Send + Sync {
    /// Chooses `id2` for a link from `id1`.
    ///
    /// With probability `existing_probability`, the target is one that the load phase created
    /// for `id1`; otherwise it is a fresh id that most likely has no link yet.
    fn choose_for_op(&self, rng: &mut dyn RngCore, id1: i64, existing_probability: f64) -> i64;
}

/// The default [`EndpointChooser`].
///
/// Every `id1` is assumed to have `fanout` links to the ids following it in the id range,
/// wrapping around at the end. Fresh ids lie above `max_id` and are striped by requester, so that
/// concurrent requesters do not create the same new links.
#[derive(Clone, Debug)]
pub struct Id2Chooser {
    start_id: i64,
    max_id: i64,
    fanout: i64,
    requesters: i64,
    requester: i64,
}

impl Id2Chooser {
    /// Creates a chooser for `requester` out of `requesters`.
    pub fn new(start_id: i64, max_id: i64, fanout: u32, requesters: usize, requester: usize) -> Self {
        Self {
            start_id,
            max_id,
            fanout: i64::from(fanout.max(1)),
            requesters: requesters.max(1) as i64,
            requester: requester as i64,
        }
    }

    /// Returns the `index`-th existing target of `id1`.
    pub fn existing(&self, id1: i64, index: i64) -> i64 {
        let range = self.max_id - self.start_id;
        self.start_id + (id1 - self.start_id + index).rem_euclid(range)
    }
}

impl EndpointChooser for Id2Chooser {
    fn choose_for_op(&self, rng: &mut dyn RngCore, id1: i64, existing_probability: f64) -> i64 {
        if rng.random_bool(existing_probability.clamp(0.0, 1.0)) {
            let index = rng.random_range(0..self.fanout);
            self.existing(id1, index)
        } else {
            let slot = rng.random_range(0..self.max_id - self.start_id);
            self.max_id + slot * self.requesters + self.requester
        }
    }
}

/// Picks operand ids from the configured access distributions.
#[derive(Debug)]
pub struct IdSelector {
    start_id: i64,
    max_id: i64,
    read: Box<dyn AccessDistribution>,
    write: Box<dyn AccessDistribution>,
    node: Option<Box<dyn AccessDistribution>>,
    endpoints: Box<dyn EndpointChooser>,
    multiget_counts: Option<Box<dyn ProbabilityDistribution>>,
}

impl IdSelector {
    /// Creates a selector over `[start_id, max_id)`.
    pub fn new(
        start_id: i64,
        max_id: i64,
        read: Box<dyn AccessDistribution>,
        write: Box<dyn AccessDistribution>,
        node: Option<Box<dyn AccessDistribution>>,
        endpoints: Box<dyn EndpointChooser>,
    ) -> Self {
        Self {
            start_id,
            max_id,
            read,
            write,
            node,
            endpoints,
            multiget_counts: None,
        }
    }

    /// Draws the number of links per multiget from `counts` instead of always reading one.
    pub fn with_multiget_counts(mut self, counts: Box<dyn ProbabilityDistribution>) -> Self {
        self.multiget_counts = Some(counts);
        self
    }

    /// Returns `true` if ids can be chosen for node operations.
    pub fn has_node_access(&self) -> bool {
        self.node.is_some()
    }

    /// Chooses an id for the given access pattern.
    ///
    /// `previous` is the id last chosen for the same pattern. If the distribution exposes a
    /// shuffler, the drawn rank is mapped to its position in the id space.
    ///
    /// # Panics
    ///
    /// Panics if no node distribution is configured and `kind` is [`AccessKind::Node`], or if the
    /// chosen id lies outside of `[start_id, max_id)`.
    pub fn choose_id(&self, kind: AccessKind, rng: &mut dyn RngCore, previous: i64) -> i64 {
        let dist = match kind {
            AccessKind::Read => &self.read,
            AccessKind::Write => &self.write,
            AccessKind::Node => match &self.node {
                Some(node) => node,
                None => panic!("node access distribution not configured"),
            },
        };

        let mut id = dist.next_id(rng, previous);
        tracing::trace!(id, ?kind, "id generated");

        if let Some(shuffler) = dist.shuffler() {
            id = self.start_id + shuffler.permute(id - self.start_id);
        }

        assert!(
            (self.start_id..self.max_id).contains(&id),
            "{kind:?} distribution chose id {id} outside of [{}, {})",
            self.start_id,
            self.max_id
        );
        id
    }

    /// Chooses the target of a link operation on `id1`.
    pub fn choose_id2(&self, rng: &mut dyn RngCore, id1: i64, existing_probability: f64) -> i64 {
        self.endpoints.choose_for_op(rng, id1, existing_probability)
    }

    /// Chooses the targets read by a multiget on `id1`.
    pub fn choose_multiget_id2s(&self, rng: &mut dyn RngCore, id1: i64) -> Vec<i64> {
        let count = match &self.multiget_counts {
            Some(counts) => counts.choose(rng).max(0) as usize,
            None => 1,
        };

        (0..count)
            .map(|_| self.choose_id2(rng, id1, EXISTING_ON_MULTIGET))
            .collect()
    }
}
