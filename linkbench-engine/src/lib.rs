//! The request engine of the linkbench workload generator.
//!
//! The engine drives a configurable number of concurrent requesters against a graph store. Each
//! requester issues a stream of link and node operations drawn from an operation mix, picks its
//! operands from pluggable access distributions, paces itself to a target request rate and gives
//! up once it exceeds its failure budget. Latencies are recorded per operation kind, and progress
//! is aggregated over all requesters.
//!
//! Stores are consumed through the [`LinkStore`] and [`NodeStore`] traits. An [`InMemoryStore`]
//! is included for smoke runs and tests.
//!
//! The entry point is [`run`], which spawns one [`Requester`] per configured requester on the
//! current tokio runtime.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod distribution;
pub mod error;
pub mod failure_budget;
pub mod id_selector;
pub mod progress;
pub mod rate_limiter;
pub mod requester;
mod runner;
pub mod selector;
pub mod stats;
pub mod store;
pub mod tail_cache;

pub use config::{MultigetConfig, RequestConfig};
pub use error::{ConfigError, RequesterError, StoreError, StoreResult};
pub use requester::{Requester, RequesterReport, RequesterState};
pub use runner::{RunReport, run};
pub use stats::{LatencyHistograms, LatencyStats, OperationSummary, SampledStats};
pub use store::{InMemoryStore, LinkStore, NodeStore, Stores};
