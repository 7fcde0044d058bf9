use rand::{Rng, RngCore};
use rand_distr::{Distribution, Zipf};
use serde::{Deserialize, Serialize};

use super::AccessDistribution;
use crate::error::ConfigError;

/// Configuration of an [`AccessDistribution`].
///
/// The `type` field in YAML or `__TYPE` in environment variables determines which variant is used.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AccessConfig {
    /// Every id is equally likely.
    Uniform,

    /// Ids are ranked by popularity and drawn from a Zipf distribution over ranks.
    Zipf {
        /// The Zipf exponent. Larger values concentrate accesses on fewer ids.
        shape: f64,

        /// Spread hot ranks over the id space instead of accessing the lowest ids most.
        #[serde(default)]
        shuffle: bool,
    },

    /// Ids are accessed in order, wrapping around at the end of the range.
    RoundRobin,
}

impl AccessConfig {
    /// Builds the configured distribution over `[start_id, max_id)`.
    pub fn build(
        &self,
        start_id: i64,
        max_id: i64,
    ) -> Result<Box<dyn AccessDistribution>, ConfigError> {
        if start_id >= max_id {
            return Err(ConfigError::EmptyIdRange {
                start: start_id,
                max: max_id,
            });
        }

        Ok(match *self {
            AccessConfig::Uniform => Box::new(UniformAccess { start_id, max_id }),
            AccessConfig::Zipf { shape, shuffle } => {
                Box::new(ZipfAccess::new(start_id, max_id, shape, shuffle)?)
            }
            AccessConfig::RoundRobin => Box::new(RoundRobinAccess { start_id, max_id }),
        })
    }
}

/// Draws ids uniformly.
#[derive(Debug)]
pub struct UniformAccess {
    start_id: i64,
    max_id: i64,
}

impl AccessDistribution for UniformAccess {
    fn next_id(&self, rng: &mut dyn RngCore, _previous: i64) -> i64 {
        rng.random_range(self.start_id..self.max_id)
    }
}

/// Draws ids by Zipf-distributed popularity rank, rank 0 being the hottest.
#[derive(Debug)]
pub struct ZipfAccess {
    start_id: i64,
    max_id: i64,
    zipf: Zipf<f64>,
    shuffler: Option<Shuffler>,
}

impl ZipfAccess {
    /// Creates a Zipf distribution over `[start_id, max_id)` with the given exponent.
    pub fn new(start_id: i64, max_id: i64, shape: f64, shuffle: bool) -> Result<Self, ConfigError> {
        let n = max_id - start_id;
        let zipf = Zipf::new(n as f64, shape).map_err(|err| ConfigError::InvalidDistribution {
            name: "zipf".to_owned(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            start_id,
            max_id,
            zipf,
            shuffler: shuffle.then(|| Shuffler::new(n)),
        })
    }
}

impl AccessDistribution for ZipfAccess {
    fn next_id(&self, rng: &mut dyn RngCore, _previous: i64) -> i64 {
        // Zipf samples ranks in `[1, n]`.
        let rank = self.zipf.sample(rng) as i64 - 1;
        (self.start_id + rank).clamp(self.start_id, self.max_id - 1)
    }

    fn shuffler(&self) -> Option<&Shuffler> {
        self.shuffler.as_ref()
    }
}

/// Walks the id range in order, starting over at the beginning.
#[derive(Debug)]
pub struct RoundRobinAccess {
    start_id: i64,
    max_id: i64,
}

impl AccessDistribution for RoundRobinAccess {
    fn next_id(&self, _rng: &mut dyn RngCore, previous: i64) -> i64 {
        let next = previous.saturating_add(1);
        if next <= self.start_id || next >= self.max_id {
            self.start_id
        } else {
            next
        }
    }
}

/// A deterministic bijection on `[0, n)` decoupling popularity ranks from ids.
///
/// Ranks are mapped with `rank -> (a * rank + b) mod n`, where `a` is coprime to `n`. Adjacent
/// ranks therefore land far apart in the id space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shuffler {
    n: i64,
    a: i64,
    b: i64,
}

impl Shuffler {
    /// Creates a permutation of `[0, n)`.
    pub fn new(n: i64) -> Self {
        assert!(n > 0, "cannot shuffle an empty range");

        let mut a = (0x9E37_79B9_7F4A_7C15_u64 % n as u64) as i64;
        if n == 1 {
            a = 1;
        }
        while a == 0 || gcd(a, n) != 1 {
            a = (a + 1) % n;
        }
        let b = (0x5851_F42D_4C95_7F2D_u64 % n as u64) as i64;

        Self { n, a, b }
    }

    /// Maps a rank in `[0, n)` to its position in the id space.
    pub fn permute(&self, rank: i64) -> i64 {
        let shuffled = (self.a as i128 * rank as i128 + self.b as i128).rem_euclid(self.n as i128);
        shuffled as i64
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}
