//! Configuration for the linkbench binary.
//!
//! Configuration is loaded from the following sources, in order of precedence (highest to lowest):
//!
//! 1. Environment variables (prefixed with `LB__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! # Environment Variables
//!
//! Double underscores (`__`) denote nested configuration structures. For example:
//!
//! - `LB__REQUESTERS=8` runs eight concurrent requesters
//! - `LB__WORKLOAD__REQUEST_RATE=500` paces every requester to 500 requests per second
//! - `LB__WORKLOAD__READ_ACCESS__TYPE=zipf` selects the Zipf access distribution for reads
//!
//! # YAML Configuration File
//!
//! ```yaml
//! requesters: 8
//! seed: 1234
//!
//! workload:
//!   requests: 100000
//!   request_rate: 500
//!   read_access:
//!     type: zipf
//!     shape: 1.1
//!     shuffle: true
//! ```
//!
//! Note that partial maps are merged with their defaults. To change the operation mix, specify all
//! ten percentages.

use std::path::Path;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use linkbench_engine::RequestConfig;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "LB__";

/// Log output format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2025-06-12T09:21:44.311Z  INFO linkbench_engine::requester: requester finished requester=0
    /// ```
    Simplified,

    /// Dump out JSON lines.
    Json,
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, the final report to stdout.
#[derive(Debug, Deserialize, Serialize)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// `RUST_LOG` takes precedence if set. It also accepts per-module directives.
    ///
    /// # Default
    ///
    /// `INFO`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the linkbench binary.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Number of concurrent requesters.
    ///
    /// # Default
    ///
    /// `4`
    pub requesters: usize,

    /// Seed of all random number generators.
    ///
    /// Runs with the same seed and configuration issue the same operations. Without a seed, a
    /// random one is chosen and logged.
    pub seed: Option<u64>,

    /// Maximum number of links the in-memory store returns per link-list read.
    ///
    /// # Default
    ///
    /// `10000`
    pub range_limit: usize,

    /// Populate the in-memory store before the request phase.
    ///
    /// Every id1 gets `id2_fanout` links and one node is created per id.
    ///
    /// # Default
    ///
    /// `true`
    pub preload: bool,

    /// Options of the request phase. See [`RequestConfig`].
    pub workload: RequestConfig,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requesters: 4,
            seed: None,
            range_limit: 10_000,
            preload: true,
            workload: RequestConfig::default(),
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, an optional YAML file, and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use linkbench_engine::distribution::AccessConfig;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.requesters, 4);
            assert_eq!(config.seed, None);
            assert_eq!(config.workload.progress_freq, Duration::from_secs(6));
            assert_eq!(config.workload.node_access, Some(AccessConfig::Uniform));
            assert_eq!(config.logging.level, LevelFilter::INFO);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LB__REQUESTERS", "8");
            jail.set_env("LB__SEED", "1234");
            jail.set_env("LB__WORKLOAD__REQUEST_RATE", "500");
            jail.set_env("LB__WORKLOAD__MAX_TIME", "5m");
            jail.set_env("LB__WORKLOAD__READ_ACCESS__TYPE", "zipf");
            jail.set_env("LB__WORKLOAD__READ_ACCESS__SHAPE", "1.5");
            jail.set_env("LB__LOGGING__LEVEL", "debug");
            jail.set_env("LB__LOGGING__FORMAT", "json");

            let config = Config::load(None).unwrap();

            assert_eq!(config.requesters, 8);
            assert_eq!(config.seed, Some(1234));
            assert_eq!(config.workload.request_rate, 500.0);
            assert_eq!(config.workload.max_time, Duration::from_secs(300));
            assert_eq!(
                config.workload.read_access,
                AccessConfig::Zipf {
                    shape: 1.5,
                    shuffle: false
                }
            );
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Json);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            requesters: 2
            range_limit: 50
            workload:
                requests: 1000
                link_data_size: 1KiB
                historical_list_percent: 25
                multiget:
                    name: zipf
                    min: 1
                    max: 16
                    params:
                        shape: 1.2
                write_access:
                    type: roundrobin
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.requesters, 2);
            assert_eq!(config.range_limit, 50);
            assert_eq!(config.workload.requests, 1000);
            assert_eq!(config.workload.link_data_size.as_u64(), 1024);
            assert_eq!(config.workload.historical_list_percent, 25.0);
            assert_eq!(config.workload.write_access, AccessConfig::RoundRobin);

            let multiget = config.workload.multiget.unwrap();
            assert_eq!(multiget.name, "zipf");
            assert_eq!((multiget.min, multiget.max), (1, 16));
            assert_eq!(multiget.params["shape"], 1.2);

            Ok(())
        });
    }

    #[test]
    fn env_overrides_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            workload:
                requests: 1000
                dbid: yaml
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("LB__WORKLOAD__DBID", "env");

            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.workload.requests, 1000);
            assert_eq!(config.workload.dbid, "env");

            Ok(())
        });
    }

    #[test]
    fn log_format_from_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            logging:
                level: warn
                format: simplified
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.logging.level, LevelFilter::WARN);
            assert_eq!(config.logging.format, LogFormat::Simplified);

            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_log_format() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LB__LOGGING__FORMAT", "xml");
            assert!(Config::load(None).is_err());
            Ok(())
        });
    }
}
