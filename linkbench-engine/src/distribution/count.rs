use rand::{Rng, RngCore};
use rand_distr::{Distribution, Geometric, Zipf};

use super::{DistributionParams, ProbabilityDistribution};
use crate::error::ConfigError;

type Constructor =
    fn(i64, i64, &DistributionParams) -> Result<Box<dyn ProbabilityDistribution>, ConfigError>;

/// Identifiers of all count distributions, with their constructors.
const REGISTRY: &[(&str, Constructor)] = &[
    ("uniform", UniformCount::boxed),
    ("zipf", ZipfCount::boxed),
    ("geometric", GeometricCount::boxed),
];

/// Creates the count distribution registered under `name`, bounded to `[min, max]`.
///
/// Parameters not used by the distribution are ignored.
pub fn probability_distribution(
    name: &str,
    min: i64,
    max: i64,
    params: &DistributionParams,
) -> Result<Box<dyn ProbabilityDistribution>, ConfigError> {
    let (_, constructor) = REGISTRY
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| ConfigError::UnknownDistribution(name.to_owned()))?;

    if min > max {
        return Err(invalid(name, format!("min {min} exceeds max {max}")));
    }

    constructor(min, max, params)
}

/// Returns the identifiers accepted by [`probability_distribution`].
pub fn registered_distributions() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(id, _)| *id)
}

fn invalid(name: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidDistribution {
        name: name.to_owned(),
        reason: reason.to_string(),
    }
}

fn param(name: &str, params: &DistributionParams, key: &str) -> Result<f64, ConfigError> {
    params
        .get(key)
        .copied()
        .ok_or_else(|| invalid(name, format!("missing parameter `{key}`")))
}

/// Draws every value in `[min, max]` with equal probability.
#[derive(Debug)]
pub struct UniformCount {
    min: i64,
    max: i64,
}

impl UniformCount {
    fn boxed(
        min: i64,
        max: i64,
        _params: &DistributionParams,
    ) -> Result<Box<dyn ProbabilityDistribution>, ConfigError> {
        Ok(Box::new(Self { min, max }))
    }
}

impl ProbabilityDistribution for UniformCount {
    fn choose(&self, rng: &mut dyn RngCore) -> i64 {
        rng.random_range(self.min..=self.max)
    }
}

/// Draws values with Zipf-distributed probability, `min` being the most likely.
///
/// Parameters: `shape`, the Zipf exponent.
#[derive(Debug)]
pub struct ZipfCount {
    min: i64,
    max: i64,
    zipf: Zipf<f64>,
}

impl ZipfCount {
    fn new(min: i64, max: i64, params: &DistributionParams) -> Result<Self, ConfigError> {
        let shape = param("zipf", params, "shape")?;
        let n = (max - min + 1) as f64;
        let zipf = Zipf::new(n, shape).map_err(|err| invalid("zipf", err))?;
        Ok(Self { min, max, zipf })
    }

    fn boxed(
        min: i64,
        max: i64,
        params: &DistributionParams,
    ) -> Result<Box<dyn ProbabilityDistribution>, ConfigError> {
        Ok(Box::new(Self::new(min, max, params)?))
    }
}

impl ProbabilityDistribution for ZipfCount {
    fn choose(&self, rng: &mut dyn RngCore) -> i64 {
        let value = self.min + self.zipf.sample(rng) as i64 - 1;
        value.clamp(self.min, self.max)
    }
}

/// Draws `min` plus a geometrically distributed number of extra values, capped at `max`.
///
/// Parameters: `p`, the success probability of each trial.
#[derive(Debug)]
pub struct GeometricCount {
    min: i64,
    max: i64,
    geometric: Geometric,
}

impl GeometricCount {
    fn new(min: i64, max: i64, params: &DistributionParams) -> Result<Self, ConfigError> {
        let p = param("geometric", params, "p")?;
        let geometric = Geometric::new(p).map_err(|err| invalid("geometric", err))?;
        Ok(Self { min, max, geometric })
    }

    fn boxed(
        min: i64,
        max: i64,
        params: &DistributionParams,
    ) -> Result<Box<dyn ProbabilityDistribution>, ConfigError> {
        Ok(Box::new(Self::new(min, max, params)?))
    }
}

impl ProbabilityDistribution for GeometricCount {
    fn choose(&self, rng: &mut dyn RngCore) -> i64 {
        let extra = self.geometric.sample(rng).min((self.max - self.min) as u64);
        self.min + extra as i64
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn params(entries: &[(&str, f64)]) -> DistributionParams {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn all_registered_distributions_stay_in_bounds() {
        let params = params(&[("shape", 0.8), ("p", 0.3)]);
        let mut rng = SmallRng::seed_from_u64(7);

        for name in registered_distributions() {
            let dist = probability_distribution(name, 1, 5, &params).unwrap();
            for _ in 0..1_000 {
                let value = dist.choose(&mut rng);
                assert!((1..=5).contains(&value), "{name} produced {value}");
            }
        }
    }

    #[test]
    fn lookup_ignores_case() {
        let dist = probability_distribution("Uniform", 2, 2, &Default::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(dist.choose(&mut rng), 2);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let result = probability_distribution("pareto", 1, 10, &Default::default());
        assert!(matches!(result, Err(ConfigError::UnknownDistribution(name)) if name == "pareto"));
    }

    #[test]
    fn missing_parameter_is_rejected() {
        let result = probability_distribution("zipf", 1, 10, &Default::default());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let result = probability_distribution("uniform", 10, 1, &Default::default());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDistribution { .. })
        ));
    }
}
