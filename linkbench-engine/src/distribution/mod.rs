//! Pluggable distributions that shape the generated workload.
//!
//! - [`AccessDistribution`]s pick the node ids operations are issued against. A distribution may
//!   describe hotness by *rank* and expose a [`Shuffler`] that spreads hot ranks over the id space.
//! - [`ProbabilityDistribution`]s pick bounded counts, such as the fan-out of a multiget. They are
//!   created by name through [`probability_distribution`].

use std::collections::BTreeMap;
use std::fmt::Debug;

use rand::RngCore;

mod access;
mod count;

pub use access::{AccessConfig, RoundRobinAccess, Shuffler, UniformAccess, ZipfAccess};
pub use count::{
    GeometricCount, UniformCount, ZipfCount, probability_distribution, registered_distributions,
};

/// Numeric parameters of a distribution, keyed by parameter name.
pub type DistributionParams = BTreeMap<String, f64>;

/// Picks ids from `[start_id, max_id)`.
pub trait AccessDistribution: Debug + Send + Sync {
    /// Draws the next id.
    ///
    /// `previous` is the id most recently accessed through this distribution, so that
    /// distributions can model locality.
    fn next_id(&self, rng: &mut dyn RngCore, previous: i64) -> i64;

    /// Returns the permutation mapping ranks drawn by this distribution to actual ids.
    fn shuffler(&self) -> Option<&Shuffler> {
        None
    }
}

/// Picks integers from a bounded range `[min, max]`.
pub trait ProbabilityDistribution: Debug + Send + Sync {
    /// Draws the next value.
    fn choose(&self, rng: &mut dyn RngCore) -> i64;
}
