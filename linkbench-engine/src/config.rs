//! Configuration of the request phase.
//!
//! All options have defaults that run a small mixed workload. The structure is meant to be
//! embedded into the configuration of a binary and deserialized with `serde`:
//!
//! ```yaml
//! requests: 100000
//! request_rate: 500
//! max_time: 5m
//! max_id: 1000001
//! operations:
//!   add_link: 10
//!   get_link_list: 90
//! read_access:
//!   type: zipf
//!   shape: 1.1
//!   shuffle: true
//! ```

use std::time::Duration;

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

use crate::distribution::{AccessConfig, DistributionParams};
use crate::selector::OperationMix;

/// Number of links read by a multiget, drawn from a registered count distribution.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MultigetConfig {
    /// Identifier of the count distribution, see
    /// [`registered_distributions`](crate::distribution::registered_distributions).
    pub name: String,
    /// Smallest number of links per multiget.
    pub min: i64,
    /// Largest number of links per multiget.
    pub max: i64,
    /// Distribution-specific parameters.
    #[serde(default)]
    pub params: DistributionParams,
}

/// Options of the request phase, shared by all requesters.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Requests issued by every requester.
    pub requests: u64,

    /// Target requests per second of every requester. `0` disables pacing.
    pub request_rate: f64,

    /// Failed requests a requester tolerates before aborting. Negative values never abort.
    pub max_failed_requests: i64,

    /// Wall-clock limit of the request phase. `0s` disables the limit.
    #[serde(with = "humantime_serde")]
    pub max_time: Duration,

    /// Smallest id1 accessed. Values below `1` are raised to `1`.
    pub min_id: i64,

    /// One past the largest id1 accessed.
    pub max_id: i64,

    /// Payload size of written links.
    pub link_data_size: ByteSize,

    /// Percentages of each operation kind.
    pub operations: OperationMix,

    /// Number of links per multiget. Without this, every multiget reads a single link.
    pub multiget: Option<MultigetConfig>,

    /// Percentage of link-list reads that continue a previously truncated list.
    pub historical_list_percent: f64,

    /// Interval of the per-requester progress log.
    #[serde(with = "humantime_serde")]
    pub progress_freq: Duration,

    /// Interval of the interim per-requester stats log. `0s` only logs at the end.
    #[serde(with = "humantime_serde")]
    pub display_freq: Duration,

    /// Upper bound of sketch bins kept per requester and operation kind.
    pub max_stat_samples: u32,

    /// Name of the database the stores operate on.
    pub dbid: String,

    /// Existing out-degree assumed for every id1 when choosing link targets.
    pub id2_fanout: u32,

    /// Access pattern of link reads.
    pub read_access: AccessConfig,

    /// Access pattern of link writes.
    pub write_access: AccessConfig,

    /// Access pattern of node operations. Required if the mix contains node operations.
    pub node_access: Option<AccessConfig>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            requests: 10_000,
            request_rate: 0.0,
            max_failed_requests: 0,
            max_time: Duration::from_secs(60),
            min_id: 1,
            max_id: 10_001,
            link_data_size: ByteSize::b(8),
            operations: OperationMix {
                add_link: 9.0,
                delete_link: 3.0,
                update_link: 8.0,
                count_link: 4.9,
                multiget_link: 0.5,
                get_link_list: 50.7,
                add_node: 2.6,
                update_node: 7.4,
                delete_node: 1.0,
                get_node: 12.9,
            },
            multiget: None,
            historical_list_percent: 0.0,
            progress_freq: Duration::from_secs(6),
            display_freq: Duration::from_secs(60),
            max_stat_samples: 10_000,
            dbid: "linkdb".to_owned(),
            id2_fanout: 10,
            read_access: AccessConfig::Uniform,
            write_access: AccessConfig::Uniform,
            node_access: Some(AccessConfig::Uniform),
        }
    }
}

impl RequestConfig {
    /// Returns the first id1 accessed.
    pub fn start_id(&self) -> i64 {
        self.min_id.max(1)
    }

    /// Returns `true` if the id range holds a single id1, which reads one fixed link repeatedly.
    pub fn is_single_link(&self) -> bool {
        self.start_id() + 1 == self.max_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mix_is_valid() {
        let config = RequestConfig::default();
        let thresholds = config.operations.cumulative();
        assert!((thresholds[9] - 100.0).abs() < 1e-5);
    }

    #[test]
    fn clamps_start_id() {
        let config = RequestConfig {
            min_id: -5,
            max_id: 2,
            ..Default::default()
        };
        assert_eq!(config.start_id(), 1);
        assert!(config.is_single_link());
    }
}
